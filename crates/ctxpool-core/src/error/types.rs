//! Core error type and result helpers

use thiserror::Error;

/// Result type alias for ctxpool operations
pub type ContextResult<T> = Result<T, ContextError>;

/// Main error type for the context control plane
#[derive(Error, Debug, Clone)]
pub enum ContextError {
    /// Configuration loading or persistence errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Caller supplied something the operation cannot accept
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Operation requires a started manager
    #[error("Context manager is not started")]
    NotStarted,

    /// `start` called twice
    #[error("Context manager is already started")]
    AlreadyStarted,

    /// A compression is already running for this session
    #[error("Compression already in progress; retry after it completes")]
    CompressionInProgress,

    /// Summarization provider errors
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        provider: Option<String>,
    },

    /// Snapshot storage errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        context: Option<String>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// Requested entity does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Anything else
    #[error("{message}")]
    Other { message: String },
}

impl ContextError {
    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CTX_CONFIG",
            Self::InvalidInput { .. } => "CTX_INVALID_INPUT",
            Self::NotStarted => "CTX_NOT_STARTED",
            Self::AlreadyStarted => "CTX_ALREADY_STARTED",
            Self::CompressionInProgress => "CTX_COMPRESSION_IN_PROGRESS",
            Self::Llm { .. } => "CTX_LLM",
            Self::Storage { .. } => "CTX_STORAGE",
            Self::Io { .. } => "CTX_IO",
            Self::Json { .. } => "CTX_JSON",
            Self::NotFound { .. } => "CTX_NOT_FOUND",
            Self::Other { .. } => "CTX_OTHER",
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CompressionInProgress | Self::Llm { .. })
    }
}
