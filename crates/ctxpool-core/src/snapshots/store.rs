//! Capped snapshot store

use crate::error::{ContextError, ContextResult};
use crate::types::Message;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use super::storage::SnapshotStorage;
use super::types::{Snapshot, SnapshotId, SnapshotMetadata, SnapshotSummary};

/// Creates, restores and evicts snapshots over a [`SnapshotStorage`]
pub struct SnapshotStore {
    storage: Arc<dyn SnapshotStorage>,
    max_snapshots: AtomicUsize,
}

impl SnapshotStore {
    pub fn new(storage: Arc<dyn SnapshotStorage>, max_snapshots: usize) -> Self {
        Self {
            storage,
            max_snapshots: AtomicUsize::new(max_snapshots.max(1)),
        }
    }

    pub fn max_snapshots(&self) -> usize {
        self.max_snapshots.load(Ordering::Relaxed)
    }

    /// Change the cap. Takes effect at the next `create_snapshot`.
    pub fn set_max_snapshots(&self, max_snapshots: usize) {
        self.max_snapshots
            .store(max_snapshots.max(1), Ordering::Relaxed);
    }

    /// Persist a copy of `messages`, then evict the oldest snapshots beyond
    /// the cap.
    pub async fn create_snapshot(
        &self,
        messages: &[Message],
        mut metadata: SnapshotMetadata,
    ) -> ContextResult<Snapshot> {
        let existing = self.storage.list().await?;
        metadata.sequence = existing.last().map_or(1, |s| s.sequence + 1);
        metadata.message_count = messages.len();

        let snapshot = Snapshot {
            id: SnapshotId::new(),
            created_at: Utc::now(),
            messages: messages.to_vec(),
            metadata,
        };
        self.storage.save(&snapshot).await?;
        info!(
            id = %snapshot.id,
            reason = snapshot.metadata.reason.as_str(),
            messages = snapshot.metadata.message_count,
            "Created snapshot"
        );

        self.evict_overflow().await?;
        Ok(snapshot)
    }

    /// Messages captured by snapshot `id`
    pub async fn restore(&self, id: &SnapshotId) -> ContextResult<Vec<Message>> {
        id.validate()?;
        match self.storage.load(id).await? {
            Some(snapshot) => Ok(snapshot.messages),
            None => Err(ContextError::not_found(format!("snapshot {}", id))),
        }
    }

    /// Oldest first
    pub async fn list(&self) -> ContextResult<Vec<SnapshotSummary>> {
        self.storage.list().await
    }

    pub async fn delete(&self, id: &SnapshotId) -> ContextResult<()> {
        id.validate()?;
        self.storage.delete(id).await
    }

    async fn evict_overflow(&self) -> ContextResult<()> {
        let summaries = self.storage.list().await?;
        let cap = self.max_snapshots();
        if summaries.len() <= cap {
            return Ok(());
        }
        for summary in &summaries[..summaries.len() - cap] {
            debug!(id = %summary.id, sequence = summary.sequence, "Evicting snapshot");
            self.storage.delete(&summary.id).await?;
        }
        Ok(())
    }
}
