//! File-based snapshot storage

use crate::error::{ContextError, ContextResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use super::super::types::{Snapshot, SnapshotId, SnapshotSummary};
use super::{SnapshotStorage, sort_oldest_first};

/// Stores one JSON document per snapshot:
/// ```text
/// base_path/
///   {snapshot_id}.json
/// ```
/// Writes go to `{snapshot_id}.json.tmp` first and are renamed into place,
/// so a crash never leaves a half-written record under the real name.
pub struct FileSnapshotStorage {
    base_path: PathBuf,
}

impl FileSnapshotStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn snapshot_path(&self, id: &SnapshotId) -> ContextResult<PathBuf> {
        id.validate()?;
        Ok(self.base_path.join(format!("{}.json", id.as_str())))
    }

    fn temp_path(&self, id: &SnapshotId) -> ContextResult<PathBuf> {
        id.validate()?;
        Ok(self.base_path.join(format!("{}.json.tmp", id.as_str())))
    }

    async fn ensure_dir(&self) -> ContextResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            ContextError::storage_with_context(
                format!("Failed to create snapshot directory: {}", e),
                self.base_path.display().to_string(),
            )
        })
    }

    /// Read and parse a record. Corrupt records are reported and skipped.
    async fn read_record(&self, path: &Path) -> ContextResult<Option<Snapshot>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ContextError::storage(format!(
                    "Failed to read snapshot file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("Ignoring corrupted snapshot {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SnapshotStorage for FileSnapshotStorage {
    async fn save(&self, snapshot: &Snapshot) -> ContextResult<()> {
        self.ensure_dir().await?;

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| ContextError::storage(format!("Failed to serialize snapshot: {}", e)))?;

        let tmp = self.temp_path(&snapshot.id)?;
        let path = self.snapshot_path(&snapshot.id)?;
        fs::write(&tmp, json.as_bytes())
            .await
            .map_err(|e| ContextError::storage(format!("Failed to write snapshot file: {}", e)))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| ContextError::storage(format!("Failed to move snapshot into place: {}", e)))?;

        debug!("Saved snapshot {} to {:?}", snapshot.id, path);
        Ok(())
    }

    async fn load(&self, id: &SnapshotId) -> ContextResult<Option<Snapshot>> {
        self.read_record(&self.snapshot_path(id)?).await
    }

    async fn list(&self) -> ContextResult<Vec<SnapshotSummary>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await.map_err(|e| {
            ContextError::storage(format!("Failed to read snapshot directory: {}", e))
        })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ContextError::storage(format!("Failed to read directory entry: {}", e)))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match self.read_record(&path).await? {
                    Some(snapshot) if snapshot.id.validate().is_ok() => {
                        summaries.push(SnapshotSummary::from(&snapshot));
                    }
                    Some(snapshot) => {
                        warn!(
                            "Ignoring snapshot {} with malformed id {}",
                            path.display(),
                            snapshot.id
                        );
                    }
                    None => {}
                }
            }
        }

        sort_oldest_first(&mut summaries);
        Ok(summaries)
    }

    async fn delete(&self, id: &SnapshotId) -> ContextResult<()> {
        match fs::remove_file(self.snapshot_path(id)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ContextError::storage(format!(
                "Failed to delete snapshot {}: {}",
                id, e
            ))),
        }
    }
}
