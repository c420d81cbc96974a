//! Tracing subscriber setup

use ctxpool_core::config::LoggingConfig;
use ctxpool_core::error::{ContextError, ContextResult};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `config.level`.
///
/// Fails if a global subscriber is already set or the level is not a valid
/// filter directive.
pub fn init(config: &LoggingConfig) -> ContextResult<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        "pretty" => builder.pretty().try_init(),
        other => {
            return Err(ContextError::invalid_field(
                "format",
                format!("unknown log format '{}'", other),
            ));
        }
    };
    result.map_err(|e| ContextError::config(format!("failed to install subscriber: {}", e)))
}

fn env_filter(config: &LoggingConfig) -> ContextResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| {
        ContextError::config_with_context(
            format!("invalid log level '{}': {}", config.level, e),
            "logging.level",
        )
    })
}
