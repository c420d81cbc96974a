//! Environment variable overrides

use crate::config::model::ContextSettings;
use crate::error::{ContextError, ContextResult};
use serde_json::{Map, Value};
use std::env;

/// Prefix for every settings override, e.g. `CTXPOOL_TARGET_SIZE`
pub const ENV_PREFIX: &str = "CTXPOOL_";

/// Default settings with `CTXPOOL_*` overrides applied
pub fn load_from_env() -> ContextResult<ContextSettings> {
    let mut settings = ContextSettings::default();
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

/// Overlay `CTXPOOL_*` environment variables onto `settings`
pub fn apply_env_overrides(settings: &mut ContextSettings) -> ContextResult<()> {
    apply_overrides(settings, env::vars())
}

/// Overlay `(name, value)` pairs. Names without the prefix are ignored;
/// prefixed names that match no setting are an error.
pub(crate) fn apply_overrides<I>(settings: &mut ContextSettings, vars: I) -> ContextResult<()>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut patch = Map::new();
    for (name, raw) in vars {
        let Some(key) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let key = key.to_ascii_lowercase();
        if key.is_empty() {
            continue;
        }
        let value = env_value_for(settings, &key, &raw);
        patch.insert(key, value);
    }

    if patch.is_empty() {
        return Ok(());
    }

    settings.merge(&patch).map_err(|e| {
        ContextError::config_with_context(e.to_string(), "Applying CTXPOOL_* environment overrides")
    })
}

/// Typed value for one override. A value that reads as a number or boolean
/// but is rejected by its setting is passed as a plain string instead, so
/// `CTXPOOL_MODEL=123` still names a model.
fn env_value_for(settings: &ContextSettings, key: &str, raw: &str) -> Value {
    let typed = parse_env_value(raw);
    if typed.is_string() {
        return typed;
    }
    let mut probe = settings.clone();
    let mut patch = Map::new();
    patch.insert(key.to_string(), typed.clone());
    if probe.merge(&patch).is_ok() {
        return typed;
    }
    let text = Value::String(raw.trim().to_string());
    patch.insert(key.to_string(), text.clone());
    if probe.merge(&patch).is_ok() { text } else { typed }
}

/// Numbers and booleans come through as JSON, anything else as a string
fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
        _ => Value::String(trimmed.to_string()),
    }
}
