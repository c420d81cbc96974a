//! From trait implementations for ContextError conversions

use super::types::ContextError;

impl From<serde_json::Error> for ContextError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}
