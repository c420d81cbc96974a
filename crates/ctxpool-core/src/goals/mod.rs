//! Goal markers
//!
//! Summaries are asked to annotate task state with one marker per line:
//!
//! ```text
//! [CHECKPOINT] Wire up the storage layer - COMPLETED
//! [DECISION] Use SQLite for the index - LOCKED
//! [ARTIFACT] modified src/index.rs
//! ```
//!
//! The parser turns those lines into [`GoalUpdate`]s so the structured task
//! state survives compression.

mod parser;
mod types;

pub use parser::{GoalMarkerParser, GoalStats};
pub use types::{ArtifactAction, CheckpointStatus, GoalUpdate};
