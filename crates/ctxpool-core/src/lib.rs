//! ctxpool core library
//!
//! Context-window control plane for long-running LLM conversations: token
//! accounting against a budget, threshold-driven compression that never
//! drops user messages, goal markers parsed from summaries, tiered system
//! prompts and message snapshots.

pub mod compression;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod goals;
pub mod hardware;
pub mod llm;
pub mod manager;
pub mod prompt;
pub mod snapshots;
pub mod types;

// Re-export commonly used types
pub use compression::{
    CompressionFailure, CompressionResult, CompressionService, CompressionStrategy, StrategyKind,
};
pub use config::{ContextSettings, LoggingConfig, load_settings};
pub use context::{
    ContextPool, ContextTier, ContextUsage, EstimatingCounter, MemoryGuard, TierChange,
    TierSelector, TokenCounter,
};
pub use error::{ContextError, ContextResult};
pub use events::{ContextEvent, EventBus};
pub use goals::{GoalMarkerParser, GoalUpdate};
pub use hardware::{HardwareInfo, HardwareMonitor, ModelProfile, ProfileProvider};
pub use llm::{StreamChunk, SummaryProvider, SummaryRequest, TextStream};
pub use manager::{ContextManager, ContextManagerBuilder};
pub use snapshots::{SnapshotId, SnapshotStore};
pub use types::{Message, MessageId, MessageRole};
