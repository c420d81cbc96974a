//! Error types for ctxpool
//!
//! Every fallible operation in the crate returns [`ContextResult`]. Transient
//! upstream failures (summarization errors, cancelled summaries) are usually recovered
//! locally and surfaced as events instead; what reaches the caller as an
//! error is input validation, lifecycle misuse, storage trouble, or a
//! rejected concurrent compression.

mod constructors;
mod conversions;
mod types;

pub use types::{ContextError, ContextResult};
