//! Tier-aware system prompt assembly

use crate::context::ContextTier;

/// Behavioral guidance appended to the system prompt for a tier
pub fn tier_guidance(tier: ContextTier) -> &'static str {
    match tier {
        ContextTier::Tier1Minimal => {
            "Context is very limited. Keep answers short, do not restate earlier content, \
             and refer to files by path instead of quoting them."
        }
        ContextTier::Tier2Basic => {
            "Context is limited. Prefer concise answers and summarize long tool output."
        }
        ContextTier::Tier3Standard => "Balance detail with brevity.",
        ContextTier::Tier4Premium => {
            "A large context is available. Detailed explanations and multi-file reasoning are fine."
        }
        ContextTier::Tier5Ultra => {
            "A very large context is available. Keep thorough working notes and cross-reference \
             earlier parts of the conversation freely."
        }
    }
}

/// `base` followed by a context-budget section for `tier`
pub fn build_system_prompt(base: &str, tier: ContextTier) -> String {
    let base = base.trim_end();
    let section = format!("## Context budget ({})\n{}", tier, tier_guidance(tier));
    if base.is_empty() {
        section
    } else {
        format!("{}\n\n{}", base, section)
    }
}
