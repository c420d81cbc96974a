//! Context budget: counting, pooling, tiers and pressure monitoring

pub mod counter;
pub mod guard;
pub mod pool;
pub mod tiers;

pub use counter::{EstimatingCounter, TokenCounter};
pub use guard::{GuardAction, GuardLevel, MemoryGuard};
pub use pool::{ContextPool, ContextUsage};
pub use tiers::{ContextTier, TierBreakpoints, TierChange, TierSelector};
