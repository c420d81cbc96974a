//! Streaming text generation contract used for summarization

use crate::error::ContextResult;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A chunk of streamed model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Incremental content
    pub content: Option<String>,
    /// Whether this is the final chunk
    pub is_final: bool,
    /// Finish reason (if final)
    pub finish_reason: Option<String>,
}

impl StreamChunk {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            is_final: false,
            finish_reason: None,
        }
    }

    pub fn final_chunk(finish_reason: Option<String>) -> Self {
        Self {
            content: None,
            is_final: true,
            finish_reason,
        }
    }
}

/// Stream of generated text chunks
pub type TextStream = Pin<Box<dyn Stream<Item = ContextResult<StreamChunk>> + Send>>;

/// Input for one summarization call
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    /// Fixed instruction for the model
    pub instructions: String,
    /// Rendered span to summarize
    pub transcript: String,
    /// Output cap in tokens
    pub max_tokens: usize,
}

/// Model that can stream a summary
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn stream_summary(&self, request: SummaryRequest) -> ContextResult<TextStream>;

    /// Provider name for logs
    fn name(&self) -> &str {
        "summary-provider"
    }
}

/// Utility functions for working with text streams
pub mod stream_utils {
    use super::*;
    use futures::StreamExt;

    /// Why a collection stopped early
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum CollectStop {
        Finished,
        /// Output reached `max_chars` and the rest was discarded
        Truncated,
    }

    /// Concatenate content chunks until the stream ends, a final chunk
    /// arrives, or `max_chars` characters have been collected.
    pub async fn collect_text(
        mut stream: TextStream,
        max_chars: usize,
    ) -> ContextResult<(String, CollectStop)> {
        let mut text = String::new();
        let mut chars = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(content) = chunk.content {
                for ch in content.chars() {
                    if chars >= max_chars {
                        return Ok((text, CollectStop::Truncated));
                    }
                    text.push(ch);
                    chars += 1;
                }
            }
            if chunk.is_final {
                break;
            }
        }

        Ok((text, CollectStop::Finished))
    }

    /// Build a stream from ready chunks
    pub fn from_chunks(chunks: Vec<ContextResult<StreamChunk>>) -> TextStream {
        Box::pin(futures::stream::iter(chunks))
    }
}
