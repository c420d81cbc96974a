//! Compression strategies

use crate::config::ContextSettings;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of original tokens that must survive any compression
pub const MIN_RETENTION_RATIO: f64 = 0.3;

/// Summary cap used when a strategy does not name one
pub const DEFAULT_SUMMARY_MAX_TOKENS: usize = 1024;

/// Hybrid sends at most this many times the summary cap to the model
pub const HYBRID_INPUT_MULTIPLIER: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Drop the oldest non-user messages
    Truncate,
    /// Replace the oldest non-user messages with a generated summary
    Summarize,
    /// Keep a recency window, summarize a bounded slice of what falls out,
    /// drop the rest
    #[default]
    Hybrid,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Truncate => "truncate",
            Self::Summarize => "summarize",
            Self::Hybrid => "hybrid",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStrategy {
    pub kind: StrategyKind,
    /// Tokens of recent non-user history kept verbatim
    pub preserve_recent: usize,
    pub summary_max_tokens: Option<usize>,
}

impl CompressionStrategy {
    pub fn truncate(preserve_recent: usize) -> Self {
        Self {
            kind: StrategyKind::Truncate,
            preserve_recent,
            summary_max_tokens: None,
        }
    }

    pub fn summarize(preserve_recent: usize, summary_max_tokens: usize) -> Self {
        Self {
            kind: StrategyKind::Summarize,
            preserve_recent,
            summary_max_tokens: Some(summary_max_tokens),
        }
    }

    pub fn hybrid(preserve_recent: usize, summary_max_tokens: usize) -> Self {
        Self {
            kind: StrategyKind::Hybrid,
            preserve_recent,
            summary_max_tokens: Some(summary_max_tokens),
        }
    }

    pub fn from_settings(settings: &ContextSettings) -> Self {
        Self {
            kind: settings.strategy,
            preserve_recent: settings.preserve_recent,
            summary_max_tokens: Some(settings.summary_max_tokens),
        }
    }

    /// Same window, different strategy
    pub fn with_kind(mut self, kind: StrategyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn summary_budget(&self) -> usize {
        self.summary_max_tokens
            .unwrap_or(DEFAULT_SUMMARY_MAX_TOKENS)
            .max(1)
    }

    pub fn uses_summary(&self) -> bool {
        !matches!(self.kind, StrategyKind::Truncate)
    }
}
