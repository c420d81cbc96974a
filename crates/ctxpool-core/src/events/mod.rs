//! Lifecycle events
//!
//! The manager publishes one [`ContextEvent`] per transition on a broadcast
//! [`EventBus`]. Automatic and user-triggered paths publish the same events
//! in the same order, so subscribers never need to know which one ran.

use crate::compression::{CompressionFailure, StrategyKind};
use crate::context::TierChange;
use crate::goals::GoalUpdate;
use crate::snapshots::SnapshotId;
use tokio::sync::broadcast;

/// Events emitted by the context manager
#[derive(Debug, Clone, PartialEq)]
pub enum ContextEvent {
    /// Usage first crossed the warning threshold
    MemoryWarning { percentage: f64 },

    /// A compression began
    Summarizing {
        strategy: StrategyKind,
        message_count: usize,
        tokens: usize,
    },

    /// A compression result was applied to the history
    Compressed {
        summary: Option<String>,
        tokens_before: usize,
        tokens_after: usize,
    },

    /// A summary was generated and accepted
    AutoSummaryCreated {
        summary: String,
        goal_updates: Vec<GoalUpdate>,
    },

    /// Summarization or compression did not produce a usable result
    AutoSummaryFailed { reason: CompressionFailure },

    /// Any tier axis changed
    TierChanged(TierChange),

    /// Usage stays critical and compression cannot run right now
    CriticalSustained { percentage: f64 },

    SnapshotCreated { id: SnapshotId, reason: String },

    SnapshotRestored { id: SnapshotId, message_count: usize },
}

impl ContextEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MemoryWarning { .. } => "memory-warning",
            Self::Summarizing { .. } => "summarizing",
            Self::Compressed { .. } => "compressed",
            Self::AutoSummaryCreated { .. } => "auto-summary-created",
            Self::AutoSummaryFailed { .. } => "auto-summary-failed",
            Self::TierChanged(_) => "tier-changed",
            Self::CriticalSustained { .. } => "critical-sustained",
            Self::SnapshotCreated { .. } => "snapshot-created",
            Self::SnapshotRestored { .. } => "snapshot-restored",
        }
    }
}

/// Broadcast channel for [`ContextEvent`]s
///
/// Each subscriber receives a copy of every event published after it
/// subscribed. Slow subscribers lose the oldest events once `capacity` is
/// exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ContextEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers, 0 if nobody is listening.
    pub fn publish(&self, event: ContextEvent) -> usize {
        tracing::trace!(event = event.event_type(), "Publishing context event");
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    /// Capacity of 256 events
    fn default() -> Self {
        Self::new(256)
    }
}
