//! Compression service

use super::plan::{WindowPlan, plan_window};
use super::prompt::{instructions, render_transcript, summary_message};
use super::result::{CompressionEstimate, CompressionFailure, CompressionResult, CompressionStatus};
use super::strategy::{CompressionStrategy, HYBRID_INPUT_MULTIPLIER, StrategyKind};
use crate::context::TokenCounter;
use crate::goals::GoalMarkerParser;
use crate::llm::stream_utils::{CollectStop, collect_text};
use crate::llm::{SummaryProvider, SummaryRequest};
use crate::types::Message;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on streamed characters per summary token before exact
/// trimming with the counter
const STREAM_CHARS_PER_TOKEN: usize = 8;

struct SummaryOutcome {
    text: String,
    summarized: usize,
}

/// Reduces a message history while keeping every user message
#[derive(Clone)]
pub struct CompressionService {
    counter: Arc<dyn TokenCounter>,
    provider: Option<Arc<dyn SummaryProvider>>,
    parser: GoalMarkerParser,
}

impl CompressionService {
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            counter,
            provider: None,
            parser: GoalMarkerParser::new(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn SummaryProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn counter(&self) -> &Arc<dyn TokenCounter> {
        &self.counter
    }

    /// Compress `messages`. Never fails: summarization problems degrade to
    /// truncation with the reason in [`CompressionResult::fallback`].
    pub async fn compress(
        &self,
        messages: &[Message],
        strategy: &CompressionStrategy,
    ) -> CompressionResult {
        self.compress_with_cancel(messages, strategy, &CancellationToken::new())
            .await
    }

    /// Like [`compress`](Self::compress); cancelling `cancel` aborts the
    /// summarization call and falls back to truncation.
    pub async fn compress_with_cancel(
        &self,
        messages: &[Message],
        strategy: &CompressionStrategy,
        cancel: &CancellationToken,
    ) -> CompressionResult {
        let costs: Vec<usize> = messages
            .iter()
            .map(|m| self.counter.count_message(m))
            .collect();
        let original: usize = costs.iter().sum();

        if messages.is_empty() || original == 0 {
            return CompressionResult::unchanged(messages, original, strategy.kind, None);
        }

        let plan = plan_window(messages, &costs, strategy.preserve_recent);
        debug!(
            strategy = %strategy.kind,
            original,
            retained = plan.retained_tokens,
            dropped = plan.dropped.len(),
            "Planned compression window"
        );

        let result = if !strategy.uses_summary() || plan.dropped.is_empty() {
            self.truncated(messages, &plan, original, strategy.kind, None)
        } else {
            match self
                .summarize_dropped(messages, &costs, &plan, strategy, cancel)
                .await
            {
                Ok(outcome) => self.summarized(messages, &plan, original, strategy.kind, outcome),
                Err(failure) => {
                    warn!(reason = %failure, "Summarization failed, falling back to truncation");
                    self.truncated(messages, &plan, original, StrategyKind::Truncate, Some(failure))
                }
            }
        };

        let result = verify_user_messages(messages, result);
        if !result.is_inflated() {
            info!(
                strategy = %result.strategy,
                before = result.original_tokens,
                after = result.compressed_tokens,
                ratio = result.compression_ratio,
                "Compressed history"
            );
        }
        result
    }

    /// Predict tokens after compression without calling the model
    pub fn estimate_compression(
        &self,
        messages: &[Message],
        strategy: &CompressionStrategy,
    ) -> CompressionEstimate {
        let costs: Vec<usize> = messages
            .iter()
            .map(|m| self.counter.count_message(m))
            .collect();
        let original: usize = costs.iter().sum();
        if original == 0 {
            return CompressionEstimate {
                estimated_tokens: 0,
                estimated_ratio: 1.0,
            };
        }

        let plan = plan_window(messages, &costs, strategy.preserve_recent);
        let mut estimated = plan.retained_tokens;
        if strategy.uses_summary() && !plan.dropped.is_empty() {
            let dropped_tokens: usize = plan.dropped.iter().map(|&i| costs[i]).sum();
            let input_tokens = match strategy.kind {
                StrategyKind::Hybrid => {
                    dropped_tokens.min(strategy.summary_budget() * HYBRID_INPUT_MULTIPLIER)
                }
                _ => dropped_tokens,
            };
            estimated += input_tokens.min(strategy.summary_budget()) + self.counter.message_overhead();
        }

        CompressionEstimate {
            estimated_tokens: estimated,
            estimated_ratio: estimated as f64 / original as f64,
        }
    }

    fn truncated(
        &self,
        messages: &[Message],
        plan: &WindowPlan,
        original: usize,
        strategy: StrategyKind,
        fallback: Option<CompressionFailure>,
    ) -> CompressionResult {
        let compressed = plan.retained_tokens;
        let status = if plan.dropped.is_empty() || compressed >= original {
            CompressionStatus::Inflated
        } else {
            CompressionStatus::Ok
        };

        CompressionResult {
            preserved: plan.kept(messages).cloned().collect(),
            summary: None,
            original_tokens: original,
            compressed_tokens: compressed,
            compression_ratio: compressed as f64 / original as f64,
            status,
            strategy,
            fallback,
            dropped_count: plan.dropped.len(),
            summarized_count: 0,
            goal_updates: Vec::new(),
        }
    }

    fn summarized(
        &self,
        messages: &[Message],
        plan: &WindowPlan,
        original: usize,
        strategy: StrategyKind,
        outcome: SummaryOutcome,
    ) -> CompressionResult {
        let summary = summary_message(&outcome.text);
        let compressed = plan.retained_tokens + self.counter.count_message(&summary);
        let status = if compressed >= original {
            debug!(original, compressed, "Summary did not shrink the history");
            CompressionStatus::Inflated
        } else {
            CompressionStatus::Ok
        };

        CompressionResult {
            preserved: plan.kept(messages).cloned().collect(),
            goal_updates: self.parser.parse(&outcome.text),
            summary: Some(summary),
            original_tokens: original,
            compressed_tokens: compressed,
            compression_ratio: compressed as f64 / original as f64,
            status,
            strategy,
            fallback: None,
            dropped_count: plan.dropped.len(),
            summarized_count: outcome.summarized,
        }
    }

    async fn summarize_dropped(
        &self,
        messages: &[Message],
        costs: &[usize],
        plan: &WindowPlan,
        strategy: &CompressionStrategy,
        cancel: &CancellationToken,
    ) -> Result<SummaryOutcome, CompressionFailure> {
        let provider = self.provider.as_ref().ok_or(CompressionFailure::NoProvider)?;
        let max_tokens = strategy.summary_budget();

        let selected: Vec<usize> = match strategy.kind {
            StrategyKind::Hybrid => {
                select_newest(&plan.dropped, costs, max_tokens * HYBRID_INPUT_MULTIPLIER)
            }
            _ => plan.dropped.clone(),
        };
        if selected.len() < plan.dropped.len() {
            debug!(
                summarized = selected.len(),
                discarded = plan.dropped.len() - selected.len(),
                "Summary input capped, discarding oldest overflow"
            );
        }

        let request = SummaryRequest {
            instructions: instructions(max_tokens),
            transcript: render_transcript(selected.iter().map(|&i| &messages[i])),
            max_tokens,
        };

        let generate = async {
            let stream = provider
                .stream_summary(request)
                .await
                .map_err(|e| CompressionFailure::Provider(e.to_string()))?;
            collect_text(stream, max_tokens.saturating_mul(STREAM_CHARS_PER_TOKEN))
                .await
                .map_err(|e| CompressionFailure::Provider(e.to_string()))
        };

        let (text, stop) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CompressionFailure::Cancelled),
            collected = generate => collected?,
        };
        if stop == CollectStop::Truncated {
            debug!(provider = provider.name(), "Summary stream exceeded cap, cut short");
        }

        let text = clamp_to_tokens(self.counter.as_ref(), text.trim(), max_tokens);
        if text.trim().is_empty() {
            return Err(CompressionFailure::EmptySummary);
        }

        Ok(SummaryOutcome {
            text,
            summarized: selected.len(),
        })
    }
}

/// Newest entries of `indices` whose combined cost fits `budget`, returned
/// oldest first. The newest entry is always included.
fn select_newest(indices: &[usize], costs: &[usize], budget: usize) -> Vec<usize> {
    let mut total = 0usize;
    let mut start = indices.len();
    while start > 0 {
        let cost = costs[indices[start - 1]];
        if total + cost > budget && start < indices.len() {
            break;
        }
        total += cost;
        start -= 1;
    }
    indices[start..].to_vec()
}

/// Longest prefix of `text` that fits in `max_tokens`
fn clamp_to_tokens(counter: &dyn TokenCounter, text: &str, max_tokens: usize) -> String {
    if counter.count_text(text) <= max_tokens {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let (mut lo, mut hi) = (0usize, chars.len());
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        let candidate: String = chars[..mid].iter().collect();
        if counter.count_text(&candidate) <= max_tokens {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    chars[..lo].iter().collect::<String>().trim_end().to_string()
}

/// Every user message in the input must still be present. A result that
/// lost one is replaced by the untouched input.
fn verify_user_messages(input: &[Message], result: CompressionResult) -> CompressionResult {
    let kept: HashSet<&str> = result.preserved.iter().map(|m| m.id.as_str()).collect();
    let missing = input
        .iter()
        .filter(|m| m.is_protected())
        .find(|m| !kept.contains(m.id.as_str()));

    match missing {
        None => result,
        Some(message) => {
            let reason = format!("user message {} would be removed", message.id);
            warn!(%reason, "Rejecting compression result");
            CompressionResult::unchanged(
                input,
                result.original_tokens,
                result.strategy,
                Some(CompressionFailure::InvariantViolation(reason)),
            )
        }
    }
}
