//! Snapshot data types

use crate::error::{ContextError, ContextResult};
use crate::types::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ids are hyphenated UUIDs. Anything else is rejected before it can
    /// reach a storage path.
    pub fn validate(&self) -> ContextResult<()> {
        let well_formed = self.0.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
            && uuid::Uuid::parse_str(&self.0).is_ok();
        if well_formed {
            Ok(())
        } else {
            Err(ContextError::invalid_field(
                "snapshot_id",
                format!("malformed snapshot id {:?}", self.0),
            ))
        }
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a snapshot was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotReason {
    Manual,
    PreCompression,
}

impl SnapshotReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::PreCompression => "pre_compression",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub reason: SnapshotReason,
    pub label: Option<String>,
    pub token_count: usize,
    /// Filled in by the store
    #[serde(default)]
    pub message_count: usize,
    /// Monotonic creation order, filled in by the store
    #[serde(default)]
    pub sequence: u64,
}

impl SnapshotMetadata {
    pub fn new(reason: SnapshotReason) -> Self {
        Self {
            reason,
            label: None,
            token_count: 0,
            message_count: 0,
            sequence: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_token_count(mut self, tokens: usize) -> Self {
        self.token_count = tokens;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub metadata: SnapshotMetadata,
}

/// Listing entry without the message payload
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub reason: SnapshotReason,
    pub label: Option<String>,
    pub token_count: usize,
    pub message_count: usize,
    pub sequence: u64,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            created_at: snapshot.created_at,
            reason: snapshot.metadata.reason,
            label: snapshot.metadata.label.clone(),
            token_count: snapshot.metadata.token_count,
            message_count: snapshot.messages.len(),
            sequence: snapshot.metadata.sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_validate() {
        assert!(SnapshotId::new().validate().is_ok());
    }

    #[test]
    fn test_malformed_ids_are_rejected() {
        let id = SnapshotId::new();
        for raw in [
            String::new(),
            "nope".to_string(),
            format!("../elsewhere/{id}"),
            format!("{id}/x"),
            format!("{{{id}}}"),
            format!("urn:uuid:{id}"),
        ] {
            let err = SnapshotId::from_string(raw.clone()).validate().unwrap_err();
            assert!(matches!(err, ContextError::InvalidInput { .. }), "{raw:?}");
        }
    }
}
