//! Line-oriented goal marker parser

use super::types::{ArtifactAction, CheckpointStatus, GoalUpdate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// `[CHECKPOINT] <description> - <STATUS>`
static CHECKPOINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[-*]\s+)?\[CHECKPOINT\]\s*(.+?)\s+-\s+([A-Z_-]+)\s*$").unwrap()
});

/// `[DECISION] <description>` with an optional `- LOCKED` suffix
static DECISION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[-*]\s+)?\[DECISION\]\s*(.+?)(?:\s+-\s+(LOCKED))?\s*$").unwrap()
});

/// `[ARTIFACT] <created|modified|deleted> <path>`
static ARTIFACT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[-*]\s+)?\[ARTIFACT\]\s*(created|modified|deleted)\s+(\S.*?)\s*$")
        .unwrap()
});

/// Per-kind marker counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStats {
    pub checkpoints: usize,
    pub completed_checkpoints: usize,
    pub decisions: usize,
    pub locked_decisions: usize,
    pub artifacts: usize,
}

impl GoalStats {
    pub fn total(&self) -> usize {
        self.checkpoints + self.decisions + self.artifacts
    }
}

/// Extracts [`GoalUpdate`]s from free text
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalMarkerParser;

impl GoalMarkerParser {
    pub fn new() -> Self {
        Self
    }

    /// Every well-formed marker in `text`, in order. Malformed markers are
    /// skipped one by one.
    pub fn parse(&self, text: &str) -> Vec<GoalUpdate> {
        text.lines().filter_map(parse_line).collect()
    }

    /// Same answer as `!self.parse(text).is_empty()`, stopping at the first hit
    pub fn has_markers(&self, text: &str) -> bool {
        text.lines().any(|line| parse_line(line).is_some())
    }

    pub fn stats(&self, text: &str) -> GoalStats {
        let mut stats = GoalStats::default();
        for update in self.parse(text) {
            match update {
                GoalUpdate::Checkpoint { status, .. } => {
                    stats.checkpoints += 1;
                    if status == CheckpointStatus::Completed {
                        stats.completed_checkpoints += 1;
                    }
                }
                GoalUpdate::Decision { locked, .. } => {
                    stats.decisions += 1;
                    if locked {
                        stats.locked_decisions += 1;
                    }
                }
                GoalUpdate::Artifact { .. } => stats.artifacts += 1,
            }
        }
        stats
    }
}

fn parse_line(line: &str) -> Option<GoalUpdate> {
    // cheap reject before running any pattern
    if !line.contains('[') {
        return None;
    }

    if let Some(caps) = CHECKPOINT_PATTERN.captures(line) {
        let description = caps.get(1)?.as_str().trim();
        let status = CheckpointStatus::parse(caps.get(2)?.as_str())?;
        if description.is_empty() {
            return None;
        }
        return Some(GoalUpdate::Checkpoint {
            description: description.to_string(),
            status,
        });
    }

    if let Some(caps) = DECISION_PATTERN.captures(line) {
        let description = caps.get(1)?.as_str().trim();
        if description.is_empty() || description == "-" {
            return None;
        }
        return Some(GoalUpdate::Decision {
            description: description.to_string(),
            locked: caps.get(2).is_some(),
        });
    }

    if let Some(caps) = ARTIFACT_PATTERN.captures(line) {
        let action = ArtifactAction::parse(caps.get(1)?.as_str())?;
        let path = caps.get(2)?.as_str().trim();
        if path.is_empty() {
            return None;
        }
        return Some(GoalUpdate::Artifact {
            action,
            path: path.to_string(),
        });
    }

    None
}
