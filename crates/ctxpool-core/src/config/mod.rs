//! Configuration for the context control plane
//!
//! Settings are a flat key/value document. They are loaded from a JSON, TOML
//! or YAML file, overlaid with `CTXPOOL_*` environment variables, merged at
//! runtime through [`ContextSettings::set_field`] and saved atomically.

mod env_loader;
mod file_loader;
mod logging_config;
mod model;
mod persistence;

pub use env_loader::{ENV_PREFIX, apply_env_overrides, load_from_env};
pub use file_loader::load_from_file;
pub use logging_config::LoggingConfig;
pub use model::ContextSettings;
pub use persistence::{default_config_path, default_snapshot_dir, save_to_file};

use crate::error::ContextResult;
use std::path::Path;

/// Load settings from an optional file, apply environment overrides and
/// clamp everything into range.
pub fn load_settings(path: Option<&Path>) -> ContextResult<ContextSettings> {
    let mut settings = match path {
        Some(path) => load_from_file(path)?,
        None => ContextSettings::default(),
    };
    apply_env_overrides(&mut settings)?;
    settings.normalize();
    Ok(settings)
}
