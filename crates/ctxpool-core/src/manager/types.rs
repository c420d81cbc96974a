//! Types for the context manager

use crate::compression::CompressionResult;
use crate::config::ContextSettings;
use crate::context::{ContextPool, MemoryGuard, TierChange, TierSelector};
use crate::snapshots::SnapshotId;
use crate::types::Message;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Started,
}

/// Who asked for a compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Trigger {
    Automatic,
    Manual,
}

/// What a compression run did
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOutcome {
    /// Whether the history was replaced
    pub applied: bool,
    pub result: CompressionResult,
    /// Snapshot taken before compressing, if any
    pub snapshot_id: Option<SnapshotId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOutcome {
    /// Window size after clamping
    pub target_size: usize,
    pub tier_change: Option<TierChange>,
}

/// Mutable session state, guarded by one mutex
pub(super) struct SessionState {
    pub lifecycle: LifecycleState,
    pub streaming: bool,
    pub messages: Vec<Message>,
    /// Tokens of `messages`
    pub message_tokens: usize,
    pub base_prompt: String,
    pub system_prompt: String,
    pub prompt_tokens: usize,
    pub settings: ContextSettings,
    pub pool: ContextPool,
    pub guard: MemoryGuard,
    pub tiers: TierSelector,
    /// Bumped on stop and whenever the history is replaced wholesale
    pub generation: u64,
    pub cancel: CancellationToken,
}

impl SessionState {
    pub fn new(settings: ContextSettings, tiers: TierSelector) -> Self {
        Self {
            lifecycle: LifecycleState::Stopped,
            streaming: false,
            messages: Vec::new(),
            message_tokens: 0,
            base_prompt: String::new(),
            system_prompt: String::new(),
            prompt_tokens: 0,
            pool: ContextPool::new(settings.target_size, settings.min_size, settings.max_size),
            guard: MemoryGuard::new(&settings),
            tiers,
            settings,
            generation: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.lifecycle == LifecycleState::Started
    }

    /// Push committed token totals into the pool
    pub fn sync_pool(&mut self) {
        self.pool
            .set_current_tokens(self.message_tokens + self.prompt_tokens);
    }
}
