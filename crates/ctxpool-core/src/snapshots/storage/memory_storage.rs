//! In-memory snapshot storage

use crate::error::ContextResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::super::types::{Snapshot, SnapshotId, SnapshotSummary};
use super::{SnapshotStorage, sort_oldest_first};

/// Snapshot storage that lives as long as the process
#[derive(Default)]
pub struct MemorySnapshotStorage {
    snapshots: RwLock<HashMap<String, Snapshot>>,
}

impl MemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStorage for MemorySnapshotStorage {
    async fn save(&self, snapshot: &Snapshot) -> ContextResult<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.id.as_str().to_string(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, id: &SnapshotId) -> ContextResult<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(id.as_str()).cloned())
    }

    async fn list(&self) -> ContextResult<Vec<SnapshotSummary>> {
        let snapshots = self.snapshots.read().await;
        let mut summaries: Vec<_> = snapshots.values().map(SnapshotSummary::from).collect();
        sort_oldest_first(&mut summaries);
        Ok(summaries)
    }

    async fn delete(&self, id: &SnapshotId) -> ContextResult<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.remove(id.as_str());
        Ok(())
    }

    async fn exists(&self, id: &SnapshotId) -> ContextResult<bool> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.contains_key(id.as_str()))
    }
}
