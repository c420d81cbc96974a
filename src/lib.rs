//! ctxpool
//!
//! Re-exports the core library and provides the tracing bootstrap hosts use
//! before creating a [`ContextManager`].

pub mod logging;

pub use ctxpool_core::*;
