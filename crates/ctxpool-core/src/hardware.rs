//! Hardware capability and model profiles
//!
//! Polling the GPU is the host's job. This module only consumes what the
//! host reports and turns it into a context size the hardware can hold.

use crate::context::TierBreakpoints;
use crate::error::ContextResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// KV-cache cost assumed when no model profile is available
pub const DEFAULT_BYTES_PER_TOKEN: u64 = 128 * 1024;

/// Accelerator memory in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

impl HardwareInfo {
    pub fn new(total: u64, used: u64) -> Self {
        Self {
            total,
            used,
            available: total.saturating_sub(used),
        }
    }
}

/// Source of hardware memory readings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HardwareMonitor: Send + Sync {
    async fn get_info(&self) -> ContextResult<HardwareInfo>;
}

/// Monitor that always reports the same reading
#[derive(Debug, Clone, Copy)]
pub struct StaticHardwareMonitor {
    info: HardwareInfo,
}

impl StaticHardwareMonitor {
    pub fn new(info: HardwareInfo) -> Self {
        Self { info }
    }
}

#[async_trait]
impl HardwareMonitor for StaticHardwareMonitor {
    async fn get_info(&self) -> ContextResult<HardwareInfo> {
        Ok(self.info)
    }
}

/// Memory needed to run a model at one context size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextProfile {
    pub size: usize,
    pub vram_estimate: u64,
}

/// Per-model context characteristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub model_id: String,
    pub context_profiles: Vec<ContextProfile>,
    pub default_context: usize,
    pub max_context: usize,
    /// Model-specific tier brackets
    #[serde(default)]
    pub breakpoints: Option<TierBreakpoints>,
}

impl ModelProfile {
    /// Largest profiled size that fits in `usable` bytes
    pub fn largest_fitting(&self, usable: u64) -> Option<usize> {
        self.context_profiles
            .iter()
            .filter(|p| p.vram_estimate <= usable)
            .map(|p| p.size)
            .max()
    }
}

/// Lookup of model profiles by id
#[cfg_attr(test, mockall::automock)]
pub trait ProfileProvider: Send + Sync {
    fn lookup(&self, model_id: &str) -> Option<ModelProfile>;
}

/// In-memory profile table
#[derive(Debug, Clone, Default)]
pub struct StaticProfiles {
    profiles: HashMap<String, ModelProfile>,
}

impl StaticProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: ModelProfile) -> Self {
        self.insert(profile);
        self
    }

    pub fn insert(&mut self, profile: ModelProfile) {
        self.profiles.insert(profile.model_id.clone(), profile);
    }
}

impl ProfileProvider for StaticProfiles {
    fn lookup(&self, model_id: &str) -> Option<ModelProfile> {
        self.profiles.get(model_id).cloned()
    }
}

/// Largest context size the hardware can hold, clamped to `[min, max]`.
///
/// With a profile, the answer is the largest profiled size whose VRAM
/// estimate fits after reserving `vram_buffer`, capped by the model's own
/// limit. Without one, [`DEFAULT_BYTES_PER_TOKEN`] is assumed.
pub fn capacity_tokens(
    info: &HardwareInfo,
    vram_buffer: u64,
    profile: Option<&ModelProfile>,
    min_size: usize,
    max_size: usize,
) -> usize {
    let usable = info.available.saturating_sub(vram_buffer);
    let raw = match profile {
        Some(profile) => profile
            .largest_fitting(usable)
            .unwrap_or(min_size)
            .min(profile.max_context.max(min_size)),
        None => usize::try_from(usable / DEFAULT_BYTES_PER_TOKEN).unwrap_or(usize::MAX),
    };
    raw.clamp(min_size, max_size.max(min_size))
}
