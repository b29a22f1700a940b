//! `iamgen-config`: settings for the iamgen pipeline.
//!
//! Provides:
//! - Typed settings schema with defaults for every field
//! - YAML loading, `${ENV_VAR}` substitution and `IAMGEN_*` overrides
//! - Validation with path-tagged errors and warnings

pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use env::{
    apply_env_overrides, apply_env_overrides_with, collect_referenced_vars, resolve_env_vars,
    resolve_env_vars_with, MissingEnvVarError,
};
pub use io::{config_file_path, load_settings, load_settings_with, CONFIG_FILE_NAME};
pub use schema::{GenerationSettings, LogFormat, LoggingSettings, Settings};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Result};

/// Settings that passed validation, with the warnings found along the way.
///
/// Warnings are held rather than logged so the caller can emit them once a
/// subscriber is installed from `settings.logging`.
#[derive(Debug)]
pub struct PreparedSettings {
    pub settings: Settings,
    pub warnings: Vec<ConfigValidationError>,
}

impl PreparedSettings {
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
    }
}

/// Load, substitute, override, and validate settings.
///
/// Any validation error fails the load; the error message lists all of them.
pub fn load_and_prepare(path: &Path) -> Result<PreparedSettings> {
    load_and_prepare_with(path, &std::env::vars().collect())
}

/// [`load_and_prepare`] against an explicit environment.
pub fn load_and_prepare_with(path: &Path, env: &HashMap<String, String>) -> Result<PreparedSettings> {
    let settings = load_settings_with(path, env)?;

    let report = validate(&settings);
    if !report.is_valid() {
        let errors: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("{} config error(s): {}", errors.len(), errors.join("; "));
    }

    Ok(PreparedSettings {
        settings,
        warnings: report.warnings,
    })
}
