//! Snapshot storage backends

use crate::error::ContextResult;
use async_trait::async_trait;

use super::types::{Snapshot, SnapshotId, SnapshotSummary};

mod file_storage;
mod memory_storage;


pub use file_storage::FileSnapshotStorage;
pub use memory_storage::MemorySnapshotStorage;

/// Trait for snapshot storage backends
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Persist a snapshot, replacing any previous record with the same id
    async fn save(&self, snapshot: &Snapshot) -> ContextResult<()>;

    /// Load a snapshot. Missing or unreadable records yield `None`.
    async fn load(&self, id: &SnapshotId) -> ContextResult<Option<Snapshot>>;

    /// All readable snapshots, oldest first
    async fn list(&self) -> ContextResult<Vec<SnapshotSummary>>;

    async fn delete(&self, id: &SnapshotId) -> ContextResult<()>;

    async fn exists(&self, id: &SnapshotId) -> ContextResult<bool> {
        Ok(self.load(id).await?.is_some())
    }
}

pub(crate) fn sort_oldest_first(summaries: &mut [SnapshotSummary]) {
    summaries.sort_by(|a, b| {
        a.sequence
            .cmp(&b.sequence)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}
