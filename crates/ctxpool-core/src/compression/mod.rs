//! History compression
//!
//! [`CompressionService`] shrinks a message sequence under one of three
//! strategies. Whatever the strategy, user-authored messages are never
//! removed, at least [`MIN_RETENTION_RATIO`] of the original tokens are kept
//! verbatim, and a result that does not shrink the history is marked
//! [`CompressionStatus::Inflated`] so the caller can refuse to apply it.

mod plan;
mod prompt;
mod result;
mod service;
mod strategy;


pub use prompt::{SUMMARY_HEADER, SUMMARY_INSTRUCTIONS, render_transcript};
pub use result::{CompressionEstimate, CompressionFailure, CompressionResult, CompressionStatus};
pub use service::CompressionService;
pub use strategy::{
    CompressionStrategy, DEFAULT_SUMMARY_MAX_TOKENS, HYBRID_INPUT_MULTIPLIER, MIN_RETENTION_RATIO,
    StrategyKind,
};
