//! Core ContextManager struct and constructors

use crate::compression::{CompressionEstimate, CompressionService, CompressionStrategy};
use crate::config::ContextSettings;
use crate::context::{
    ContextTier, ContextUsage, EstimatingCounter, TierBreakpoints, TierChange, TierSelector,
    TokenCounter,
};
use crate::error::{ContextError, ContextResult};
use crate::events::{ContextEvent, EventBus};
use crate::hardware::{HardwareMonitor, ProfileProvider};
use crate::llm::SummaryProvider;
use crate::prompt::build_system_prompt;
use crate::snapshots::{
    FileSnapshotStorage, MemorySnapshotStorage, SnapshotStorage, SnapshotStore, SnapshotSummary,
};
use crate::types::Message;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

use super::types::SessionState;

/// Context window manager for one conversation
///
/// Handles:
/// - Token accounting for committed and streaming content
/// - Threshold warnings and automatic compression
/// - Tier selection and the tier-aware system prompt
/// - Snapshots of the message history
pub struct ContextManager {
    pub(super) state: Mutex<SessionState>,
    /// Set while a compression run owns the history
    pub(super) compressing: AtomicBool,
    pub(super) counter: Arc<dyn TokenCounter>,
    pub(super) compression: CompressionService,
    pub(super) snapshots: SnapshotStore,
    pub(super) hardware: Option<Arc<dyn HardwareMonitor>>,
    pub(super) profiles: Option<Arc<dyn ProfileProvider>>,
    pub(super) events: EventBus,
}

/// Builder for [`ContextManager`]
pub struct ContextManagerBuilder {
    settings: ContextSettings,
    counter: Option<Arc<dyn TokenCounter>>,
    provider: Option<Arc<dyn SummaryProvider>>,
    hardware: Option<Arc<dyn HardwareMonitor>>,
    profiles: Option<Arc<dyn ProfileProvider>>,
    snapshot_storage: Option<Arc<dyn SnapshotStorage>>,
    events: Option<EventBus>,
}

impl ContextManagerBuilder {
    pub fn new(settings: ContextSettings) -> Self {
        Self {
            settings,
            counter: None,
            provider: None,
            hardware: None,
            profiles: None,
            snapshot_storage: None,
            events: None,
        }
    }

    pub fn with_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Model used to write summaries
    pub fn with_provider(mut self, provider: Arc<dyn SummaryProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_hardware(mut self, monitor: Arc<dyn HardwareMonitor>) -> Self {
        self.hardware = Some(monitor);
        self
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileProvider>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_snapshot_storage(mut self, storage: Arc<dyn SnapshotStorage>) -> Self {
        self.snapshot_storage = Some(storage);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> ContextManager {
        let mut settings = self.settings;
        settings.normalize();

        let counter = self
            .counter
            .unwrap_or_else(|| Arc::new(EstimatingCounter::new()));
        let mut compression = CompressionService::new(counter.clone());
        if let Some(provider) = self.provider {
            compression = compression.with_provider(provider);
        }

        let storage = match (self.snapshot_storage, &settings.snapshot_dir) {
            (Some(storage), _) => storage,
            (None, Some(dir)) => {
                Arc::new(FileSnapshotStorage::new(dir.clone())) as Arc<dyn SnapshotStorage>
            }
            (None, None) => Arc::new(MemorySnapshotStorage::new()),
        };
        let snapshots = SnapshotStore::new(storage, settings.max_snapshots);

        let breakpoints = settings
            .model
            .as_deref()
            .zip(self.profiles.as_ref())
            .and_then(|(model, profiles)| profiles.lookup(model))
            .and_then(|profile| profile.breakpoints)
            .unwrap_or_default();

        ContextManager {
            state: Mutex::new(SessionState::new(settings, TierSelector::new(breakpoints))),
            compressing: AtomicBool::new(false),
            counter,
            compression,
            snapshots,
            hardware: self.hardware,
            profiles: self.profiles,
            events: self.events.unwrap_or_default(),
        }
    }
}

impl ContextManager {
    /// Manager with the estimating counter, in-memory snapshots and no
    /// summary model
    pub fn new(settings: ContextSettings) -> Self {
        ContextManagerBuilder::new(settings).build()
    }

    pub fn builder(settings: ContextSettings) -> ContextManagerBuilder {
        ContextManagerBuilder::new(settings)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn usage(&self) -> ContextUsage {
        self.state.lock().pool.usage()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    pub fn settings(&self) -> ContextSettings {
        self.state.lock().settings.clone()
    }

    /// System prompt with the tier section for the effective prompt tier
    pub fn system_prompt(&self) -> String {
        self.state.lock().system_prompt.clone()
    }

    /// Last published tier state
    pub fn tier_state(&self) -> Option<TierChange> {
        self.state.lock().tiers.current()
    }

    pub fn breakpoints(&self) -> TierBreakpoints {
        self.state.lock().tiers.breakpoints()
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().is_started()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().streaming
    }

    pub fn is_compressing(&self) -> bool {
        self.compressing.load(Ordering::Acquire)
    }

    /// Predicted effect of compressing now with the configured strategy
    pub fn estimate_compression(&self) -> CompressionEstimate {
        let (messages, strategy) = {
            let state = self.state.lock();
            (
                state.messages.clone(),
                CompressionStrategy::from_settings(&state.settings),
            )
        };
        self.compression.estimate_compression(&messages, &strategy)
    }

    pub async fn list_snapshots(&self) -> ContextResult<Vec<SnapshotSummary>> {
        self.snapshots.list().await
    }

    pub(super) fn lock_started(&self) -> ContextResult<MutexGuard<'_, SessionState>> {
        let state = self.state.lock();
        if !state.is_started() {
            return Err(ContextError::NotStarted);
        }
        Ok(state)
    }

    pub(super) fn publish(&self, event: ContextEvent) {
        tracing::debug!(event = event.event_type(), "Publishing context event");
        self.events.publish(event);
    }

    /// Re-render the system prompt for `tier` and refresh the pool
    pub(super) fn apply_prompt_tier(&self, state: &mut SessionState, tier: ContextTier) {
        state.system_prompt = build_system_prompt(&state.base_prompt, tier);
        state.prompt_tokens = self.counter.count_text(&state.system_prompt)
            + self.counter.message_overhead();
        state.sync_pool();
    }

    /// Replace the whole history and recount it
    pub(super) fn replace_history(&self, state: &mut SessionState, messages: Vec<Message>) {
        state.message_tokens = self.counter.count_messages(&messages);
        state.messages = messages;
        state.generation += 1;
        state.sync_pool();
    }
}
