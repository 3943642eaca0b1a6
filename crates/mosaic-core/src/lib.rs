//! Mosaic Core - Object Model for Trait Composition
//!
//! This crate provides the dynamic object model the composition engine works
//! on. It contains no composition logic itself.
//!
//! # Architecture
//!
//! ## Values and Procedures
//! - `Value`: dynamic member value; objects and functions compare by identity
//! - `Function`: procedure with identity, optionally carrying an install hook
//!   (a decorator) and, for composite types, pre-flattened bases
//!
//! ## Member Tables
//! - `ObjectRef`: shared ordered member table with a delegation parent
//! - `PropertyDescriptor`: data or accessor member plus its flags
//! - Descriptor utilities: `get_descriptor`, `remove`
//!
//! ## Ambient
//! - `ComposeError`: every failure the engine raises
//! - `ComposeConfig`: conflict policy and accessor materialisation
//! - `ConflictObserver`: seam for conflict diagnostics

#![forbid(unsafe_code)]

// === Core Modules ===

/// Dynamic values
pub mod value;

/// Procedures with identity and install hooks
pub mod function;

/// Member tables with delegation
pub mod object;

/// Property descriptors and descriptor utilities
pub mod descriptor;

/// Unified error handling
pub mod errors;

/// Engine configuration
pub mod config;

/// Conflict diagnostics
pub mod diagnostics;

// === Public API Re-exports ===

pub use config::{ComposeConfig, ConflictPolicy, ENV_CONFLICT_POLICY, ENV_MATERIALIZE_ACCESSORS};
pub use descriptor::{
    get_descriptor, is_accessor_descriptor, is_data_descriptor, remove, DescriptorKind,
    DescriptorPatch, PropertyDescriptor,
};
pub use diagnostics::{Conflict, ConflictObserver, TracingObserver};
pub use errors::{ComposeError, Result};
pub use function::{Constructible, FlattenedBases, Function, Install, InstallHook};
pub use object::ObjectRef;
pub use value::Value;
