//! File-based settings loading

use crate::config::model::ContextSettings;
use crate::error::{ContextError, ContextResult};
use std::fs;
use std::path::Path;

/// Load settings from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default settings if the file doesn't exist.
pub fn load_from_file(path: &Path) -> ContextResult<ContextSettings> {
    if !path.exists() {
        return Ok(ContextSettings::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        ContextError::config_with_context(
            format!("Failed to read settings file: {}", e),
            format!("Reading settings from '{}'", path.display()),
        )
    })?;

    let mut settings: ContextSettings = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            ContextError::config_with_context(
                format!("Failed to parse TOML settings: {}", e),
                format!("Deserializing TOML settings from '{}'", path.display()),
            )
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            ContextError::config_with_context(
                format!("Failed to parse YAML settings: {}", e),
                format!("Deserializing YAML settings from '{}'", path.display()),
            )
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            ContextError::config_with_context(
                format!("Failed to parse JSON settings: {}", e),
                format!("Deserializing JSON settings from '{}'", path.display()),
            )
        })?,
    };

    settings.normalize();
    Ok(settings)
}
