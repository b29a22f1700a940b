//! Settings file discovery and loading.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::env::{apply_env_overrides_with, resolve_env_vars_with};
use crate::schema::Settings;

/// Default settings file name, relative to the working directory.
pub const CONFIG_FILE_NAME: &str = "iamgen.yaml";

/// Environment variable naming an explicit settings file.
pub const ENV_CONFIG_PATH: &str = "IAMGEN_CONFIG";

/// Resolve the settings path. Priority: `IAMGEN_CONFIG` > `./iamgen.yaml`.
pub fn config_file_path() -> PathBuf {
    match std::env::var(ENV_CONFIG_PATH) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(CONFIG_FILE_NAME),
    }
}

/// Read the raw YAML document as a JSON value tree.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn read_raw(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(Some(Value::Object(Default::default())));
    }

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    // a document holding only comments parses as null
    if value.is_null() {
        return Ok(Some(Value::Object(Default::default())));
    }
    Ok(Some(value))
}

/// Load settings from `path` with `${VAR}` substitution and `IAMGEN_*`
/// overrides taken from `env`. A missing file yields defaults.
pub fn load_settings_with(path: &Path, env: &HashMap<String, String>) -> Result<Settings> {
    let mut settings = match read_raw(path)? {
        Some(value) => {
            let value = resolve_env_vars_with(&value, env)
                .context("Failed to resolve env vars in config")?;
            let settings: Settings = serde_json::from_value(value)
                .with_context(|| format!("Invalid settings in: {}", path.display()))?;
            info!(path = %path.display(), "Loaded config");
            settings
        }
        None => Settings::default(),
    };

    apply_env_overrides_with(&mut settings, env)?;
    Ok(settings)
}

/// [`load_settings_with`] against the process environment.
pub fn load_settings(path: &Path) -> Result<Settings> {
    load_settings_with(path, &std::env::vars().collect())
}
