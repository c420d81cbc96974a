//! Message intake, streaming accounting, memory checks and snapshots

use crate::context::{ContextUsage, GuardAction};
use crate::error::{ContextError, ContextResult};
use crate::events::ContextEvent;
use crate::snapshots::{Snapshot, SnapshotId, SnapshotMetadata, SnapshotReason};
use crate::types::{Message, MessageId, MessageRole};
use tracing::{debug, info, warn};

use super::core::ContextManager;
use super::types::Trigger;

impl ContextManager {
    /// Commit a message to the history and let the guard react to the new
    /// usage. May run an automatic compression before returning.
    pub async fn add_message(
        &self,
        role: MessageRole,
        content: impl Into<String>,
    ) -> ContextResult<MessageId> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ContextError::invalid_field("content", "message content is empty"));
        }

        let message = Message::new(role, content);
        let id = message.id.clone();
        let action = {
            let mut state = self.lock_started()?;
            state.message_tokens += self.counter.count_message(&message);
            state.messages.push(message);
            state.sync_pool();
            let usage = state.pool.usage();
            debug!(role = %role, usage = %usage.to_log_string(), "Message added");
            state.guard.evaluate(&usage)
        };

        self.handle_guard_action(action).await;
        Ok(id)
    }

    /// Mark the start of a streamed response
    pub fn begin_streaming(&self) -> ContextResult<()> {
        let mut state = self.lock_started()?;
        state.streaming = true;
        state.pool.clear_inflight_tokens();
        Ok(())
    }

    /// Add `delta` tokens generated so far by the current stream. Negative
    /// deltas correct earlier over-estimates; the total never drops below
    /// zero. Ignored when the session is stopped.
    pub fn report_inflight_tokens(&self, delta: f64) {
        let mut state = self.state.lock();
        if state.is_started() {
            state.pool.report_inflight_tokens(delta);
        }
    }

    /// Commit the streamed response as an assistant message. Empty output
    /// commits nothing.
    pub async fn finish_streaming(
        &self,
        content: impl Into<String>,
    ) -> ContextResult<Option<MessageId>> {
        let content = content.into();
        {
            let mut state = self.lock_started()?;
            state.streaming = false;
            state.pool.clear_inflight_tokens();
        }
        if content.trim().is_empty() {
            return Ok(None);
        }
        self.add_message(MessageRole::Assistant, content).await.map(Some)
    }

    /// Drop the inflight count of an aborted stream
    pub fn cancel_streaming(&self) {
        let mut state = self.state.lock();
        state.streaming = false;
        state.pool.clear_inflight_tokens();
    }

    /// Periodic check. Evaluates usage, inflight tokens included, and acts on
    /// it exactly like a message commit would.
    pub async fn check_memory(&self) -> ContextResult<ContextUsage> {
        let action = {
            let mut state = self.lock_started()?;
            let usage = state.pool.usage();
            state.guard.evaluate(&usage)
        };
        self.handle_guard_action(action).await;
        Ok(self.usage())
    }

    pub async fn create_snapshot(&self, label: Option<String>) -> ContextResult<Snapshot> {
        let (messages, tokens) = {
            let state = self.state.lock();
            (state.messages.clone(), state.message_tokens)
        };
        self.snapshot_messages(&messages, tokens, SnapshotReason::Manual, label)
            .await
    }

    /// Replace the history with the messages of snapshot `id`
    pub async fn restore_snapshot(&self, id: &SnapshotId) -> ContextResult<usize> {
        let messages = self.snapshots.restore(id).await?;
        let count = messages.len();
        let action = {
            let mut state = self.lock_started()?;
            self.replace_history(&mut state, messages);
            let usage = state.pool.usage();
            info!(%id, messages = count, usage = %usage.to_log_string(), "Restored snapshot");
            state.guard.evaluate(&usage)
        };

        self.publish(ContextEvent::SnapshotRestored {
            id: id.clone(),
            message_count: count,
        });
        self.handle_guard_action(action).await;
        Ok(count)
    }

    pub(super) async fn snapshot_messages(
        &self,
        messages: &[Message],
        tokens: usize,
        reason: SnapshotReason,
        label: Option<String>,
    ) -> ContextResult<Snapshot> {
        let mut metadata = SnapshotMetadata::new(reason).with_token_count(tokens);
        if let Some(label) = label {
            metadata = metadata.with_label(label);
        }
        let snapshot = self.snapshots.create_snapshot(messages, metadata).await?;
        self.publish(ContextEvent::SnapshotCreated {
            id: snapshot.id.clone(),
            reason: reason.as_str().to_string(),
        });
        Ok(snapshot)
    }

    /// Turn a guard decision into events or an automatic compression
    pub(super) async fn handle_guard_action(&self, action: GuardAction) {
        if action != GuardAction::Compress {
            self.notify_guard(action);
            return;
        }
        match self.run_compression(Trigger::Automatic).await {
            Ok(outcome) => debug!(applied = outcome.applied, "Automatic compression finished"),
            Err(ContextError::CompressionInProgress) => {
                debug!("Compression already running, skipping automatic trigger")
            }
            Err(e) => warn!(error = %e, "Automatic compression failed"),
        }
    }

    /// Publish the event for a non-compressing guard decision
    pub(super) fn notify_guard(&self, action: GuardAction) {
        match action {
            GuardAction::Warn { percentage } => {
                info!(percentage, "Context usage crossed warning threshold");
                self.publish(ContextEvent::MemoryWarning { percentage });
            }
            GuardAction::ReportSustained { percentage } => {
                warn!(percentage, "Context usage remains critical");
                self.publish(ContextEvent::CriticalSustained { percentage });
            }
            GuardAction::None | GuardAction::Compress => {}
        }
    }
}
