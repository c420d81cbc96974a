//! Token budget accounting

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound for the inflight accumulator. Keeps `committed + inflight`
/// representable for any delta sequence.
const MAX_INFLIGHT_TOKENS: f64 = u32::MAX as f64;

/// Snapshot of budget consumption
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextUsage {
    /// Committed plus inflight tokens
    pub current_tokens: usize,
    pub max_tokens: usize,
    /// `current_tokens / max_tokens * 100`
    pub percentage: f64,
    pub committed_tokens: usize,
    pub inflight_tokens: usize,
}

impl ContextUsage {
    /// Usage as a fraction in `[0, ∞)`
    pub fn fraction(&self) -> f64 {
        self.percentage / 100.0
    }

    pub fn to_log_string(&self) -> String {
        format!(
            "{}/{} tokens ({:.1}%, {} inflight)",
            self.current_tokens, self.max_tokens, self.percentage, self.inflight_tokens
        )
    }
}

/// Budget bounds and live token counts for one conversation
#[derive(Debug, Clone)]
pub struct ContextPool {
    committed_tokens: usize,
    inflight_tokens: f64,
    max_tokens: usize,
    target_size: usize,
    min_size: usize,
    max_size: usize,
}

impl ContextPool {
    /// Create a pool. Bounds are repaired so that `min <= target <= max`.
    pub fn new(target_size: usize, min_size: usize, max_size: usize) -> Self {
        let min_size = min_size.max(1);
        let max_size = max_size.max(min_size);
        let target_size = target_size.clamp(min_size, max_size);
        Self {
            committed_tokens: 0,
            inflight_tokens: 0.0,
            max_tokens: target_size,
            target_size,
            min_size,
            max_size,
        }
    }

    /// Set the committed token count
    pub fn set_current_tokens(&mut self, tokens: usize) {
        self.committed_tokens = tokens;
    }

    /// Accumulate tokens from an uncommitted response. Non-finite deltas are
    /// ignored and the running total stays within `[0, MAX_INFLIGHT_TOKENS]`.
    pub fn report_inflight_tokens(&mut self, delta: f64) {
        if !delta.is_finite() {
            debug!(delta, "Ignoring non-finite inflight delta");
            return;
        }
        self.inflight_tokens = (self.inflight_tokens + delta).clamp(0.0, MAX_INFLIGHT_TOKENS);
    }

    /// Drop inflight tokens once the response is committed or abandoned
    pub fn clear_inflight_tokens(&mut self) {
        self.inflight_tokens = 0.0;
    }

    pub fn inflight_tokens(&self) -> usize {
        self.inflight_tokens.round() as usize
    }

    pub fn committed_tokens(&self) -> usize {
        self.committed_tokens
    }

    /// Set the window size. `resize` keeps it on the target; a zero window
    /// reports full usage.
    pub fn set_max_tokens(&mut self, max_tokens: usize) {
        self.max_tokens = max_tokens;
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the target size, clamped to the pool bounds. The window
    /// follows the target. Returns the applied size.
    pub fn resize(&mut self, target_size: usize) -> usize {
        self.target_size = target_size.clamp(self.min_size, self.max_size);
        self.set_max_tokens(self.target_size);
        self.target_size
    }

    /// Replace the bounds, re-clamping the target
    pub fn set_bounds(&mut self, min_size: usize, max_size: usize) -> usize {
        self.min_size = min_size.max(1);
        self.max_size = max_size.max(self.min_size);
        self.resize(self.target_size)
    }

    /// Current usage, inflight tokens included
    pub fn usage(&self) -> ContextUsage {
        let inflight = self.inflight_tokens();
        let current = self.committed_tokens.saturating_add(inflight);
        let percentage = if self.max_tokens == 0 {
            100.0
        } else {
            current as f64 / self.max_tokens as f64 * 100.0
        };
        ContextUsage {
            current_tokens: current,
            max_tokens: self.max_tokens,
            percentage,
            committed_tokens: self.committed_tokens,
            inflight_tokens: inflight,
        }
    }
}
