//! Context tiers
//!
//! A tier is a coarse bracket of window sizes. Two axes are tracked
//! independently: the tier of the active budget, and the tier the hardware
//! could sustain. The prompt tier follows hardware in auto-size mode and the
//! active budget otherwise.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bracket of context window sizes, ordered smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContextTier {
    #[serde(rename = "TIER_1_MINIMAL")]
    Tier1Minimal,
    #[serde(rename = "TIER_2_BASIC")]
    Tier2Basic,
    #[serde(rename = "TIER_3_STANDARD")]
    Tier3Standard,
    #[serde(rename = "TIER_4_PREMIUM")]
    Tier4Premium,
    #[serde(rename = "TIER_5_ULTRA")]
    Tier5Ultra,
}

impl ContextTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tier1Minimal => "TIER_1_MINIMAL",
            Self::Tier2Basic => "TIER_2_BASIC",
            Self::Tier3Standard => "TIER_3_STANDARD",
            Self::Tier4Premium => "TIER_4_PREMIUM",
            Self::Tier5Ultra => "TIER_5_ULTRA",
        }
    }
}

impl fmt::Display for ContextTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (inclusive) of tiers 2 to 5, in tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakpoints {
    pub basic: usize,
    pub standard: usize,
    pub premium: usize,
    pub ultra: usize,
}

impl Default for TierBreakpoints {
    fn default() -> Self {
        Self {
            basic: 8 * 1024,
            standard: 16 * 1024,
            premium: 32 * 1024,
            ultra: 64 * 1024,
        }
    }
}

impl TierBreakpoints {
    /// Breakpoints must be strictly ascending
    pub fn is_valid(&self) -> bool {
        self.basic < self.standard && self.standard < self.premium && self.premium < self.ultra
    }

    pub fn tier_for(&self, tokens: usize) -> ContextTier {
        if tokens >= self.ultra {
            ContextTier::Tier5Ultra
        } else if tokens >= self.premium {
            ContextTier::Tier4Premium
        } else if tokens >= self.standard {
            ContextTier::Tier3Standard
        } else if tokens >= self.basic {
            ContextTier::Tier2Basic
        } else {
            ContextTier::Tier1Minimal
        }
    }
}

/// Published whenever any tier axis changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChange {
    pub actual_context_tier: ContextTier,
    pub effective_prompt_tier: ContextTier,
    pub hardware_capability_tier: ContextTier,
    pub prompt_tier_locked: bool,
}

/// Tracks tier state and reports changes
#[derive(Debug, Clone, Default)]
pub struct TierSelector {
    breakpoints: TierBreakpoints,
    hardware_tier: Option<ContextTier>,
    current: Option<TierChange>,
}

impl TierSelector {
    pub fn new(breakpoints: TierBreakpoints) -> Self {
        let breakpoints = if breakpoints.is_valid() {
            breakpoints
        } else {
            tracing::warn!(?breakpoints, "Tier breakpoints not ascending, using defaults");
            TierBreakpoints::default()
        };
        Self {
            breakpoints,
            hardware_tier: None,
            current: None,
        }
    }

    pub fn breakpoints(&self) -> TierBreakpoints {
        self.breakpoints
    }

    /// Record the largest window the hardware can hold. The hardware tier is
    /// fixed until the next call.
    pub fn set_hardware_capacity(&mut self, tokens: usize) -> ContextTier {
        let tier = self.breakpoints.tier_for(tokens);
        self.hardware_tier = Some(tier);
        tier
    }

    pub fn hardware_tier(&self) -> Option<ContextTier> {
        self.hardware_tier
    }

    pub fn current(&self) -> Option<TierChange> {
        self.current
    }

    /// Tier state for a budget, without recording it
    pub fn evaluate(&self, budget: usize, auto_size: bool) -> TierChange {
        let actual = self.breakpoints.tier_for(budget);
        let hardware = self.hardware_tier.unwrap_or(actual);
        TierChange {
            actual_context_tier: actual,
            effective_prompt_tier: if auto_size { hardware } else { actual },
            hardware_capability_tier: hardware,
            prompt_tier_locked: auto_size,
        }
    }

    /// Recompute tiers for `budget`. Returns the new state only when some
    /// field differs from the last recorded one.
    ///
    /// In auto-size mode without a hardware reading, the first budget seen
    /// stands in for the hardware tier and stays until
    /// [`set_hardware_capacity`](Self::set_hardware_capacity).
    pub fn update(&mut self, budget: usize, auto_size: bool) -> Option<TierChange> {
        if auto_size && self.hardware_tier.is_none() {
            self.hardware_tier = Some(self.breakpoints.tier_for(budget));
        }
        let next = self.evaluate(budget, auto_size);
        if self.current == Some(next) {
            return None;
        }
        self.current = Some(next);
        Some(next)
    }
}
