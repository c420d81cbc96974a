//! Point-in-time copies of the conversation history
//!
//! Snapshots are taken on demand and before automatic compression so a bad
//! compression can be rolled back. The store keeps at most `max_snapshots`
//! and evicts the oldest first.

mod storage;
mod store;
mod types;

pub use storage::{FileSnapshotStorage, MemorySnapshotStorage, SnapshotStorage};
pub use store::SnapshotStore;
pub use types::{Snapshot, SnapshotId, SnapshotMetadata, SnapshotReason, SnapshotSummary};
