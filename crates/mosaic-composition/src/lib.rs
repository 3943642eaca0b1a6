//! Mosaic Composition - Trait Composition Engine
//!
//! Synthesizes constructible types from multiple independent sources
//! ("traits"):
//!
//! - **Base resolution** (`bases`): diamond-safe flattening of sources into
//!   constructor and member-table lists
//! - **Member merging** (`merge`): left-to-right merge with override-chain
//!   analysis, decorator installation, and conflict detection
//! - **Decorators** (`decorators`, `aspect`): `required`, `property`, `from`,
//!   and `before`/`after`/`around` advice
//! - **Composite types** (`composite`): `compose`, `create`, `mixin_into`
//!
//! # Example
//!
//! ```rust
//! use mosaic_composition::{after, compose};
//! use mosaic_core::{Function, ObjectRef, Value};
//!
//! let widget = compose(&[Value::from(ObjectRef::from_entries([(
//!     "render",
//!     Function::new(|_, _| Ok(Value::from("widget"))),
//! )]))])
//! .unwrap();
//!
//! let logged = widget
//!     .extend(&[Value::from(ObjectRef::from_entries([(
//!         "render",
//!         after(|_, _| Ok(Value::Undefined)),
//!     )]))])
//!     .unwrap();
//!
//! let instance = logged.construct(&[]).unwrap();
//! assert_eq!(instance.invoke("render", &[]).unwrap(), Value::from("widget"));
//! ```

#![forbid(unsafe_code)]

/// Flattening of composition sources
pub mod bases;

/// Member merging and conflict detection
pub mod merge;

/// Before/after/around advice
pub mod aspect;

/// Decorator primitives
pub mod decorators;

/// Composite types and the composer
pub mod composite;

pub use aspect::{after, around, aspect, before, BeforeOutcome, Layer, Weave};
pub use composite::{compose, create, mixin_into, CompositeType, Composer};
pub use decorators::{decorator, from, property, required, AliasSource};
pub use merge::{Definer, DEFINE_OWN_PROPERTY};
