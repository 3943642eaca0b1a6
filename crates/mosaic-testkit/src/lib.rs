//! Mosaic Testing Infrastructure
//!
//! Helpers shared by the workspace's unit and integration tests: call-order
//! recording, conflict collection, tracing setup, and proptest strategies.
//!
//! # Usage
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! mosaic-testkit = { path = "../mosaic-testkit" }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod observer;
pub mod recorder;
pub mod strategies;

pub use observer::CollectingObserver;
pub use recorder::Recorder;

/// Install a fmt subscriber honouring `RUST_LOG`; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
