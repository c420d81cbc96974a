//! Token counting
//!
//! Exact tokenization is provider specific and treated as a black box. The
//! [`TokenCounter`] trait lets the host plug in a real tokenizer; the default
//! [`EstimatingCounter`] approximates from character counts.

use crate::types::Message;

/// Counts tokens for text and messages. Implementations must be
/// deterministic and free of I/O.
pub trait TokenCounter: Send + Sync {
    /// Tokens in a bare string
    fn count_text(&self, text: &str) -> usize;

    /// Fixed cost added per message for role and formatting
    fn message_overhead(&self) -> usize;

    /// Tokens for one message, overhead included
    fn count_message(&self, message: &Message) -> usize {
        self.count_text(&message.content) + self.message_overhead()
    }

    /// Tokens for a message sequence
    fn count_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.count_message(m)).sum()
    }
}

/// Character-ratio token estimator
#[derive(Debug, Clone)]
pub struct EstimatingCounter {
    /// Characters per token (average)
    chars_per_token: f32,
    /// Overhead tokens per message (role, formatting)
    message_overhead: usize,
}

impl Default for EstimatingCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimatingCounter {
    pub fn new() -> Self {
        Self {
            chars_per_token: 4.0,
            message_overhead: 4,
        }
    }

    /// Create an estimator tuned for a specific provider
    pub fn for_provider(provider: &str) -> Self {
        match provider.to_lowercase().as_str() {
            "anthropic" => Self {
                chars_per_token: 3.5,
                message_overhead: 3,
            },
            "openai" | "google" | "ollama" => Self::new(),
            _ => Self::default(),
        }
    }

    pub fn with_chars_per_token(mut self, chars_per_token: f32) -> Self {
        if chars_per_token.is_finite() && chars_per_token > 0.0 {
            self.chars_per_token = chars_per_token;
        }
        self
    }

    pub fn with_message_overhead(mut self, overhead: usize) -> Self {
        self.message_overhead = overhead;
        self
    }
}

impl TokenCounter for EstimatingCounter {
    fn count_text(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.chars().count() as f32 / self.chars_per_token).ceil() as usize
    }

    fn message_overhead(&self) -> usize {
        self.message_overhead
    }
}
