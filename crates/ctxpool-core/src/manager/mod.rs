//! Conversation context manager
//!
//! [`ContextManager`] owns the live message list and wires the pool, guard,
//! tier selector, compression service and snapshot store together. It is
//! `Send + Sync` and meant to be shared through an `Arc` so a streaming
//! callback can report inflight tokens while a compression is running.
//!
//! A compression requested while another one is running is rejected with
//! [`ContextError::CompressionInProgress`](crate::error::ContextError) on the
//! manual path and skipped on the automatic path.

mod compress;
mod core;
mod operations;
mod sizing;
#[cfg(test)]
mod tests;
mod types;

pub use core::{ContextManager, ContextManagerBuilder};
pub use types::{CompressionOutcome, LifecycleState, ResizeOutcome};
