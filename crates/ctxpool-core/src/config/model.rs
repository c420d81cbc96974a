//! Settings model

use crate::compression::StrategyKind;
use crate::error::{ContextError, ContextResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const DEFAULT_COMPRESSION_THRESHOLD: f64 = 0.80;
const DEFAULT_WARNING_THRESHOLD: f64 = 0.70;

/// Runtime settings for a conversation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Requested context size in tokens
    pub target_size: usize,
    pub min_size: usize,
    pub max_size: usize,
    /// Derive the target from hardware capacity and pin the prompt tier to it
    pub auto_size: bool,
    /// Bytes of VRAM kept free when sizing from hardware
    pub vram_buffer: u64,
    pub compression_enabled: bool,
    /// Usage fraction at which compression triggers, in (0, 1]
    pub compression_threshold: f64,
    /// Usage fraction at which a one-shot warning is emitted, in (0, 1]
    pub warning_threshold: f64,
    pub snapshots_enabled: bool,
    pub max_snapshots: usize,
    pub strategy: StrategyKind,
    /// Token budget kept verbatim at the tail of the history
    pub preserve_recent: usize,
    pub summary_max_tokens: usize,
    /// Minimum spacing between automatic compression attempts
    #[serde(with = "humantime_serde")]
    pub guard_cooldown: Duration,
    /// Model identifier used for profile lookup
    pub model: Option<String>,
    /// Directory for persisted snapshots; in-memory when unset
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            target_size: 8192,
            min_size: 2048,
            max_size: 131_072,
            auto_size: false,
            vram_buffer: 512 * 1024 * 1024,
            compression_enabled: true,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            snapshots_enabled: true,
            max_snapshots: 5,
            strategy: StrategyKind::Hybrid,
            preserve_recent: 2048,
            summary_max_tokens: 1024,
            guard_cooldown: Duration::from_secs(30),
            model: None,
            snapshot_dir: None,
        }
    }
}

impl ContextSettings {
    pub fn with_target_size(mut self, size: usize) -> Self {
        self.target_size = size;
        self
    }

    pub fn with_auto_size(mut self, auto_size: bool) -> Self {
        self.auto_size = auto_size;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_thresholds(mut self, warning: f64, compression: f64) -> Self {
        self.warning_threshold = warning;
        self.compression_threshold = compression;
        self
    }

    pub fn with_guard_cooldown(mut self, cooldown: Duration) -> Self {
        self.guard_cooldown = cooldown;
        self
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    /// Clamp every value into its valid range. Never fails.
    pub fn normalize(&mut self) {
        self.compression_threshold =
            clamp_fraction("compression_threshold", self.compression_threshold, DEFAULT_COMPRESSION_THRESHOLD);
        self.warning_threshold =
            clamp_fraction("warning_threshold", self.warning_threshold, DEFAULT_WARNING_THRESHOLD);
        if self.warning_threshold > self.compression_threshold {
            warn!(
                warning = self.warning_threshold,
                compression = self.compression_threshold,
                "warning_threshold above compression_threshold, lowering it"
            );
            self.warning_threshold = self.compression_threshold;
        }

        if self.min_size == 0 {
            self.min_size = 1;
        }
        if self.max_size < self.min_size {
            warn!(min = self.min_size, max = self.max_size, "max_size below min_size, raising it");
            self.max_size = self.min_size;
        }
        let clamped = self.target_size.clamp(self.min_size, self.max_size);
        if clamped != self.target_size {
            warn!(requested = self.target_size, clamped, "target_size out of bounds");
            self.target_size = clamped;
        }

        if self.max_snapshots == 0 {
            self.max_snapshots = 1;
        }
        if self.summary_max_tokens == 0 {
            self.summary_max_tokens = 1;
        }
    }

    /// Read one field as JSON
    pub fn get_field(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.get(key).cloned(),
            _ => None,
        }
    }

    /// Set one field from a JSON value. Unknown keys and mistyped values are
    /// rejected without touching `self`.
    pub fn set_field(&mut self, key: &str, value: Value) -> ContextResult<()> {
        let mut patch = Map::new();
        patch.insert(key.to_string(), value);
        self.merge(&patch)
    }

    /// Apply a flat key/value patch atomically, then normalize.
    pub fn merge(&mut self, patch: &Map<String, Value>) -> ContextResult<()> {
        let mut doc = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => return Err(ContextError::config("settings did not serialize to an object")),
        };

        for (key, value) in patch {
            if !doc.contains_key(key) {
                return Err(ContextError::invalid_field(
                    key.clone(),
                    format!("unknown setting '{}'", key),
                ));
            }
            doc.insert(key.clone(), value.clone());
        }

        let mut merged: ContextSettings = serde_json::from_value(Value::Object(doc))
            .map_err(|e| ContextError::invalid_input(format!("invalid setting value: {}", e)))?;
        merged.normalize();
        *self = merged;
        Ok(())
    }
}

fn clamp_fraction(name: &str, value: f64, default: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        warn!(setting = name, value, default, "threshold out of range, using default");
        default
    } else if value > 1.0 {
        warn!(setting = name, value, "threshold above 1.0, clamping");
        1.0
    } else {
        value
    }
}
