//! Structured task-state assertions

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Blocked,
}

impl CheckpointStatus {
    /// Parse a marker status word, case-insensitively
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "PENDING" | "TODO" => Some(Self::Pending),
            "IN_PROGRESS" | "IN-PROGRESS" | "ACTIVE" => Some(Self::InProgress),
            "COMPLETED" | "COMPLETE" | "DONE" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "BLOCKED" => Some(Self::Blocked),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Blocked => "BLOCKED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactAction {
    Created,
    Modified,
    Deleted,
}

impl ArtifactAction {
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "created" => Some(Self::Created),
            "modified" => Some(Self::Modified),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// One parsed marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalUpdate {
    Checkpoint {
        description: String,
        status: CheckpointStatus,
    },
    Decision {
        description: String,
        locked: bool,
    },
    Artifact {
        action: ArtifactAction,
        path: String,
    },
}

impl fmt::Display for GoalUpdate {
    /// Renders the canonical marker line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkpoint { description, status } => {
                write!(f, "[CHECKPOINT] {} - {}", description, status.as_marker())
            }
            Self::Decision { description, locked } => {
                write!(f, "[DECISION] {}", description)?;
                if *locked {
                    write!(f, " - LOCKED")?;
                }
                Ok(())
            }
            Self::Artifact { action, path } => {
                let action = match action {
                    ArtifactAction::Created => "created",
                    ArtifactAction::Modified => "modified",
                    ArtifactAction::Deleted => "deleted",
                };
                write!(f, "[ARTIFACT] {} {}", action, path)
            }
        }
    }
}
