//! Compression runs shared by the automatic and manual paths

use crate::compression::{CompressionResult, CompressionStrategy, StrategyKind};
use crate::error::{ContextError, ContextResult};
use crate::events::ContextEvent;
use crate::snapshots::SnapshotReason;
use crate::types::Message;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

use super::core::ContextManager;
use super::types::{CompressionOutcome, Trigger};

/// Clears the in-progress flag when a run ends, early returns included
struct CompressionFlag<'a>(&'a AtomicBool);

impl Drop for CompressionFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ContextManager {
    /// Compress the history now.
    ///
    /// Publishes exactly what an automatic compression publishes. Fails with
    /// [`ContextError::CompressionInProgress`] while another run is active.
    pub async fn compress(&self) -> ContextResult<CompressionOutcome> {
        self.run_compression(Trigger::Manual).await
    }

    pub(super) async fn run_compression(
        &self,
        trigger: Trigger,
    ) -> ContextResult<CompressionOutcome> {
        if self
            .compressing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ContextError::CompressionInProgress);
        }
        let _flag = CompressionFlag(&self.compressing);

        let (messages, tokens, generation, strategy, cancel, snapshots_enabled) = {
            let mut state = self.lock_started()?;
            state.guard.record_attempt(Instant::now());
            (
                state.messages.clone(),
                state.message_tokens,
                state.generation,
                CompressionStrategy::from_settings(&state.settings),
                state.cancel.clone(),
                state.settings.snapshots_enabled,
            )
        };
        info!(
            ?trigger,
            strategy = %strategy.kind,
            messages = messages.len(),
            tokens,
            "Compressing context"
        );

        let snapshot_id = if snapshots_enabled && !messages.is_empty() {
            match self
                .snapshot_messages(&messages, tokens, SnapshotReason::PreCompression, None)
                .await
            {
                Ok(snapshot) => Some(snapshot.id),
                Err(e) => {
                    warn!(error = %e, "Pre-compression snapshot failed, compressing anyway");
                    None
                }
            }
        } else {
            None
        };

        self.publish(ContextEvent::Summarizing {
            strategy: strategy.kind,
            message_count: messages.len(),
            tokens,
        });

        let mut failure_reported = false;
        let mut result = self
            .compression
            .compress_with_cancel(&messages, &strategy, &cancel)
            .await;
        if let Some(reason) = &result.fallback {
            self.publish(ContextEvent::AutoSummaryFailed {
                reason: reason.clone(),
            });
            failure_reported = true;
        }
        if result.is_inflated() && result.strategy != StrategyKind::Truncate {
            warn!(
                original = result.original_tokens,
                compressed = result.compressed_tokens,
                "Summary inflated the history, retrying with truncation"
            );
            self.publish(ContextEvent::AutoSummaryFailed {
                reason: result.inflation_failure(),
            });
            failure_reported = true;
            let truncate = strategy.with_kind(StrategyKind::Truncate);
            result = self
                .compression
                .compress_with_cancel(&messages, &truncate, &cancel)
                .await;
        }

        if result.is_inflated() {
            if !failure_reported {
                let reason = result
                    .fallback
                    .clone()
                    .unwrap_or_else(|| result.inflation_failure());
                self.publish(ContextEvent::AutoSummaryFailed { reason });
            }
            warn!("Compression could not shrink the history, leaving it unchanged");
            self.reassess_after_compression();
            return Ok(CompressionOutcome {
                applied: false,
                result,
                snapshot_id,
            });
        }

        let applied = {
            let mut state = self.state.lock();
            if !state.is_started() || state.generation != generation {
                false
            } else {
                let mut next = result.messages();
                next.extend(
                    state
                        .messages
                        .get(messages.len()..)
                        .unwrap_or_default()
                        .iter()
                        .cloned(),
                );
                next.push(Message::system(compression_notice(&result)));
                self.replace_history(&mut state, next);
                info!(usage = %state.pool.usage().to_log_string(), "Applied compressed history");
                true
            }
        };

        if applied {
            let summary = result.summary_text().map(str::to_string);
            self.publish(ContextEvent::Compressed {
                summary: summary.clone(),
                tokens_before: result.original_tokens,
                tokens_after: result.compressed_tokens,
            });
            if let Some(summary) = summary {
                self.publish(ContextEvent::AutoSummaryCreated {
                    summary,
                    goal_updates: result.goal_updates.clone(),
                });
            }
        } else {
            info!("History replaced or session stopped during compression, discarding result");
        }

        self.reassess_after_compression();
        Ok(CompressionOutcome {
            applied,
            result,
            snapshot_id,
        })
    }

    /// Evaluate the guard once more so a still-critical window is reported
    fn reassess_after_compression(&self) {
        let action = {
            let mut state = self.state.lock();
            if !state.is_started() {
                return;
            }
            let usage = state.pool.usage();
            state.guard.evaluate(&usage)
        };
        self.notify_guard(action);
    }
}

/// System message recording a compression in the visible history
fn compression_notice(result: &CompressionResult) -> String {
    let mut notice = format!(
        "[Context compressed using {} strategy: {} -> {} tokens",
        result.strategy, result.original_tokens, result.compressed_tokens
    );
    if result.dropped_count > 0 {
        notice.push_str(&format!(", {} earlier messages removed", result.dropped_count));
    }
    if result.summary.is_some() {
        notice.push_str(&format!(", {} summarized", result.summarized_count));
    }
    notice.push(']');
    notice
}
