//! Memory guard
//!
//! Watches usage and decides when the manager should warn, compress, or
//! report that the window is exhausted and compression cannot help yet.

use crate::config::ContextSettings;
use crate::context::pool::ContextUsage;
use std::time::{Duration, Instant};
use tracing::debug;

/// Pressure band derived from usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GuardLevel {
    Normal,
    Warning,
    Critical,
}

/// What the manager should do after an evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuardAction {
    None,
    /// First entry into the warning band
    Warn { percentage: f64 },
    /// Critical and outside cooldown
    Compress,
    /// Critical but compression is cooling down or disabled
    ReportSustained { percentage: f64 },
}

/// NORMAL, WARNING, CRITICAL state machine with cooldown
#[derive(Debug, Clone)]
pub struct MemoryGuard {
    warning_threshold: f64,
    compression_threshold: f64,
    cooldown: Duration,
    compression_enabled: bool,
    level: GuardLevel,
    warned: bool,
    sustained_reported: bool,
    last_attempt: Option<Instant>,
}

impl MemoryGuard {
    pub fn new(settings: &ContextSettings) -> Self {
        Self {
            warning_threshold: settings.warning_threshold,
            compression_threshold: settings.compression_threshold,
            cooldown: settings.guard_cooldown,
            compression_enabled: settings.compression_enabled,
            level: GuardLevel::Normal,
            warned: false,
            sustained_reported: false,
            last_attempt: None,
        }
    }

    /// Pick up new thresholds without resetting state
    pub fn reconfigure(&mut self, settings: &ContextSettings) {
        self.warning_threshold = settings.warning_threshold;
        self.compression_threshold = settings.compression_threshold;
        self.cooldown = settings.guard_cooldown;
        self.compression_enabled = settings.compression_enabled;
    }

    pub fn level(&self) -> GuardLevel {
        self.level
    }

    pub fn evaluate(&mut self, usage: &ContextUsage) -> GuardAction {
        self.evaluate_at(usage, Instant::now())
    }

    pub fn evaluate_at(&mut self, usage: &ContextUsage, now: Instant) -> GuardAction {
        let fraction = usage.fraction();
        let level = if fraction >= self.compression_threshold {
            GuardLevel::Critical
        } else if fraction >= self.warning_threshold {
            GuardLevel::Warning
        } else {
            GuardLevel::Normal
        };
        if level != self.level {
            debug!(from = ?self.level, to = ?level, usage = %usage.to_log_string(), "Guard level changed");
        }
        self.level = level;

        match level {
            GuardLevel::Normal => {
                self.warned = false;
                self.sustained_reported = false;
                GuardAction::None
            }
            GuardLevel::Warning => {
                self.sustained_reported = false;
                if self.warned {
                    GuardAction::None
                } else {
                    self.warned = true;
                    GuardAction::Warn {
                        percentage: usage.percentage,
                    }
                }
            }
            GuardLevel::Critical => {
                self.warned = true;
                if self.compression_enabled && !self.in_cooldown(now) {
                    GuardAction::Compress
                } else if self.sustained_reported {
                    GuardAction::None
                } else {
                    self.sustained_reported = true;
                    GuardAction::ReportSustained {
                        percentage: usage.percentage,
                    }
                }
            }
        }
    }

    /// Start the cooldown window after any compression attempt
    pub fn record_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
        self.sustained_reported = false;
    }

    pub fn in_cooldown(&self, now: Instant) -> bool {
        self.last_attempt
            .is_some_and(|at| now.saturating_duration_since(at) < self.cooldown)
    }
}
