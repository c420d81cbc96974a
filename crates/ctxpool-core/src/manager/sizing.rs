//! Lifecycle, window sizing and tier selection

use crate::config::ContextSettings;
use crate::context::{GuardAction, TierChange};
use crate::error::{ContextError, ContextResult};
use crate::events::ContextEvent;
use crate::hardware::capacity_tokens;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::core::ContextManager;
use super::types::{LifecycleState, ResizeOutcome, SessionState};

impl ContextManager {
    /// Start the session.
    ///
    /// Sizes the window (from hardware when `auto_size` is set), renders the
    /// tier-aware system prompt and publishes the initial tier state.
    pub async fn start(&self, system_prompt: impl Into<String>) -> ContextResult<TierChange> {
        if self.is_started() {
            return Err(ContextError::AlreadyStarted);
        }
        let capacity = self.poll_capacity().await;

        let tiers = {
            let mut state = self.state.lock();
            if state.is_started() {
                return Err(ContextError::AlreadyStarted);
            }
            state.lifecycle = LifecycleState::Started;
            state.streaming = false;
            state.cancel = CancellationToken::new();
            state.base_prompt = system_prompt.into();
            state.pool.clear_inflight_tokens();

            let requested = state.settings.target_size;
            let auto_size = state.settings.auto_size;
            let (applied, _) = self.apply_sizing(&mut state, requested, auto_size, capacity);
            let tiers = state.tiers.evaluate(applied, auto_size);
            self.apply_prompt_tier(&mut state, tiers.effective_prompt_tier);
            info!(
                target_size = applied,
                tier = %tiers.effective_prompt_tier,
                auto_size,
                "Context session started"
            );
            tiers
        };

        self.publish(ContextEvent::TierChanged(tiers));
        Ok(tiers)
    }

    /// Stop the session. Cancels a running summarization; its result is
    /// discarded. The history is kept for a later `start`.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !state.is_started() {
            return;
        }
        state.cancel.cancel();
        state.generation += 1;
        state.lifecycle = LifecycleState::Stopped;
        state.streaming = false;
        state.pool.clear_inflight_tokens();
        info!(messages = state.messages.len(), "Context session stopped");
    }

    /// Change the window size.
    ///
    /// With `auto_size` the target comes from the hardware capacity and
    /// `new_target` is only used when no reading is available. Publishes at
    /// most one tier change.
    pub async fn resize(&self, new_target: usize, auto_size: bool) -> ContextResult<ResizeOutcome> {
        let capacity = if auto_size {
            self.poll_capacity().await
        } else {
            None
        };

        let (outcome, action) = {
            let mut state = self.lock_started()?;
            self.resize_locked(&mut state, new_target, auto_size, capacity)
        };
        self.finish_resize(outcome, action).await;
        Ok(outcome)
    }

    /// Re-read hardware capacity. In auto-size mode the window follows it.
    pub async fn refresh_hardware(&self) -> ContextResult<Option<TierChange>> {
        let Some(capacity) = self.poll_capacity().await else {
            return Ok(None);
        };

        let (outcome, action) = {
            let mut state = self.lock_started()?;
            let requested = state.settings.target_size;
            let auto_size = state.settings.auto_size;
            self.resize_locked(&mut state, requested, auto_size, Some(capacity))
        };
        self.finish_resize(outcome, action).await;
        Ok(outcome.tier_change)
    }

    /// Apply a partial settings update. Unknown keys and mistyped values
    /// reject the whole patch.
    pub async fn update_settings(&self, patch: &Map<String, Value>) -> ContextResult<ContextSettings> {
        let (settings, resized) = {
            let mut state = self.state.lock();
            let mut next = state.settings.clone();
            next.merge(patch)?;

            state.guard.reconfigure(&next);
            self.snapshots.set_max_snapshots(next.max_snapshots);
            state.pool.set_bounds(next.min_size, next.max_size);
            let (target, auto_size) = (next.target_size, next.auto_size);
            state.settings = next;

            let resized = if state.is_started() {
                Some(self.resize_locked(&mut state, target, auto_size, None))
            } else {
                state.settings.target_size = state.pool.resize(target);
                None
            };
            (state.settings.clone(), resized)
        };

        debug!(keys = ?patch.keys().collect::<Vec<_>>(), "Settings updated");
        if let Some((outcome, action)) = resized {
            self.finish_resize(outcome, action).await;
        }
        Ok(settings)
    }

    /// Largest window the hardware can hold, or `None` without a monitor or
    /// when the reading fails
    pub(super) async fn poll_capacity(&self) -> Option<usize> {
        let monitor = self.hardware.as_ref()?;
        let info = match monitor.get_info().await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Hardware query failed, keeping previous capacity");
                return None;
            }
        };

        let state = self.state.lock();
        let settings = &state.settings;
        let profile = settings
            .model
            .as_deref()
            .zip(self.profiles.as_ref())
            .and_then(|(model, profiles)| profiles.lookup(model));
        let capacity = capacity_tokens(
            &info,
            settings.vram_buffer,
            profile.as_ref(),
            settings.min_size,
            settings.max_size,
        );
        debug!(
            available = info.available,
            capacity,
            profiled = profile.is_some(),
            "Hardware capacity"
        );
        Some(capacity)
    }

    /// Resize the pool and recompute tiers. Returns the applied size and the
    /// tier change, if any.
    fn apply_sizing(
        &self,
        state: &mut SessionState,
        requested: usize,
        auto_size: bool,
        capacity: Option<usize>,
    ) -> (usize, Option<TierChange>) {
        if let Some(capacity) = capacity {
            state.tiers.set_hardware_capacity(capacity);
        }
        let target = match (auto_size, capacity) {
            (true, Some(capacity)) => capacity,
            _ => requested,
        };
        let applied = state.pool.resize(target);
        state.settings.target_size = applied;
        state.settings.auto_size = auto_size;
        (applied, state.tiers.update(applied, auto_size))
    }

    fn resize_locked(
        &self,
        state: &mut SessionState,
        requested: usize,
        auto_size: bool,
        capacity: Option<usize>,
    ) -> (ResizeOutcome, GuardAction) {
        let (applied, change) = self.apply_sizing(state, requested, auto_size, capacity);
        if let Some(change) = change {
            self.apply_prompt_tier(state, change.effective_prompt_tier);
        }
        info!(
            requested,
            applied,
            auto_size,
            tier_changed = change.is_some(),
            "Context window resized"
        );

        let usage = state.pool.usage();
        let action = state.guard.evaluate(&usage);
        (
            ResizeOutcome {
                target_size: applied,
                tier_change: change,
            },
            action,
        )
    }

    async fn finish_resize(&self, outcome: ResizeOutcome, action: GuardAction) {
        if let Some(change) = outcome.tier_change {
            self.publish(ContextEvent::TierChanged(change));
        }
        self.handle_guard_action(action).await;
    }
}
