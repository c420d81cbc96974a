//! Atomic settings persistence

use crate::config::model::ContextSettings;
use crate::error::{ContextError, ContextResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `~/.ctxpool/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".ctxpool")
        .join("config.json")
}

/// Platform data directory for persisted snapshots
pub fn default_snapshot_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_default()
        .join("ctxpool")
        .join("snapshots")
}

/// Save settings, picking the format from the extension. The document is
/// written to a sibling temp file and renamed over the target.
pub fn save_to_file(settings: &ContextSettings, path: &Path) -> ContextResult<()> {
    let content = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::to_string_pretty(settings)
            .map_err(|e| ContextError::config(format!("Failed to serialize TOML settings: {}", e)))?,
        Some("yaml") | Some("yml") => serde_yaml::to_string(settings)
            .map_err(|e| ContextError::config(format!("Failed to serialize YAML settings: {}", e)))?,
        _ => serde_json::to_string_pretty(settings)?,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                ContextError::io_with_path(e.to_string(), parent.display().to_string())
            })?;
        }
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, content)
        .map_err(|e| ContextError::io_with_path(e.to_string(), tmp.display().to_string()))?;
    fs::rename(&tmp, path)
        .map_err(|e| ContextError::io_with_path(e.to_string(), path.display().to_string()))?;

    debug!("Saved settings to {}", path.display());
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_file;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_reload_each_format() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = ContextSettings::default().with_target_size(24576);
        settings.set_field("model", json!("qwen2:7b")).unwrap();

        for name in ["s.json", "s.toml", "s.yaml"] {
            let path = temp_dir.path().join(name);
            save_to_file(&settings, &path).unwrap();
            let loaded = load_from_file(&path).unwrap();
            assert_eq!(loaded, settings, "format {}", name);
        }
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");
        save_to_file(&ContextSettings::default(), &path).unwrap();

        assert!(path.exists());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_default_paths_are_namespaced() {
        assert!(default_config_path().ends_with(".ctxpool/config.json"));
        assert!(default_snapshot_dir().ends_with("ctxpool/snapshots"));
    }
}
