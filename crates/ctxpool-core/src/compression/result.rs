//! Compression outcomes

use super::strategy::StrategyKind;
use crate::goals::GoalUpdate;
use crate::types::Message;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionStatus {
    Ok,
    /// The result is not smaller than the input and must not be applied
    Inflated,
}

/// Why compression did not produce the requested result
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CompressionFailure {
    #[error("summary provider failed: {0}")]
    Provider(String),

    #[error("summarization was cancelled")]
    Cancelled,

    #[error("summary provider returned no text")]
    EmptySummary,

    #[error("no summary provider configured")]
    NoProvider,

    #[error("compression would not reduce the history ({original} -> {compressed} tokens)")]
    Inflated { original: usize, compressed: usize },

    #[error("compression invariant violated: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionResult {
    /// Messages kept verbatim, in original order
    pub preserved: Vec<Message>,
    /// Synthetic system message standing in for the summarized span
    pub summary: Option<Message>,
    pub original_tokens: usize,
    pub compressed_tokens: usize,
    /// `compressed_tokens / original_tokens`
    pub compression_ratio: f64,
    pub status: CompressionStatus,
    /// Strategy that actually produced this result
    pub strategy: StrategyKind,
    /// Set when the requested strategy degraded to truncation
    pub fallback: Option<CompressionFailure>,
    /// Messages no longer present verbatim
    pub dropped_count: usize,
    /// Of those, how many were sent to the summarizer
    pub summarized_count: usize,
    pub goal_updates: Vec<GoalUpdate>,
}

impl CompressionResult {
    /// An inflated result that leaves `messages` untouched
    pub(crate) fn unchanged(
        messages: &[Message],
        tokens: usize,
        strategy: StrategyKind,
        fallback: Option<CompressionFailure>,
    ) -> Self {
        Self {
            preserved: messages.to_vec(),
            summary: None,
            original_tokens: tokens,
            compressed_tokens: tokens,
            compression_ratio: 1.0,
            status: CompressionStatus::Inflated,
            strategy,
            fallback,
            dropped_count: 0,
            summarized_count: 0,
            goal_updates: Vec::new(),
        }
    }

    pub fn is_inflated(&self) -> bool {
        self.status == CompressionStatus::Inflated
    }

    /// Summary text without the header line
    pub fn summary_text(&self) -> Option<&str> {
        self.summary.as_ref().map(|m| {
            m.content
                .strip_prefix(super::prompt::SUMMARY_HEADER)
                .map(str::trim_start)
                .unwrap_or(&m.content)
        })
    }

    pub fn tokens_saved(&self) -> usize {
        self.original_tokens.saturating_sub(self.compressed_tokens)
    }

    /// Replacement history: summary first, then the preserved messages
    pub fn messages(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.preserved.len() + 1);
        if let Some(summary) = &self.summary {
            out.push(summary.clone());
        }
        out.extend(self.preserved.iter().cloned());
        out
    }

    /// Failure to report when this result is not applied
    pub fn inflation_failure(&self) -> CompressionFailure {
        CompressionFailure::Inflated {
            original: self.original_tokens,
            compressed: self.compressed_tokens,
        }
    }
}

/// Cheap prediction of a compression outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionEstimate {
    pub estimated_tokens: usize,
    pub estimated_ratio: f64,
}
