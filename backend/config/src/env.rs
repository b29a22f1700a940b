//! Environment variable handling for settings.
//!
//! `${VAR_NAME}` in string values is resolved at load time. Only uppercase
//! `[A-Z_][A-Z0-9_]*` names are matched. `$${VAR}` escapes to a literal `${VAR}`.
//! After substitution, `IAMGEN_*` variables override individual fields.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use iamgen_policy::GroupBy;

use crate::schema::{LogFormat, Settings};

/// Group 1 is the escape `$`, group 2 the variable name.
static ENV_VAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(\$)?\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern compiles")
});

pub const ENV_MAPPINGS_DIR: &str = "IAMGEN_MAPPINGS_DIR";
pub const ENV_GROUP_BY: &str = "IAMGEN_GROUP_BY";
pub const ENV_LOG_LEVEL: &str = "IAMGEN_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "IAMGEN_LOG_FORMAT";

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references from the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute `${VAR}` references from `env`.
///
/// Walks the whole tree; only string leaves change. A missing or empty
/// variable is an error naming the config path that referenced it.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let var_name = &caps[2];
        if caps.get(1).is_some() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Apply `IAMGEN_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut Settings) -> Result<()> {
    apply_env_overrides_with(settings, &std::env::vars().collect())
}

/// Apply `IAMGEN_*` overrides from `env`. Empty values are ignored.
///
/// `IAMGEN_MAPPINGS_DIR` may hold several directories separated like `PATH`.
pub fn apply_env_overrides_with(settings: &mut Settings, env: &HashMap<String, String>) -> Result<()> {
    let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(dirs) = get(ENV_MAPPINGS_DIR) {
        settings.mappings_dirs = std::env::split_paths(dirs).collect::<Vec<PathBuf>>();
    }
    if let Some(group_by) = get(ENV_GROUP_BY) {
        settings.generation.group_by = group_by
            .parse::<GroupBy>()
            .map_err(|e| anyhow!("{ENV_GROUP_BY}: {e}"))?;
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        settings.logging.level = level.to_string();
    }
    if let Some(format) = get(ENV_LOG_FORMAT) {
        settings.logging.format = format
            .parse::<LogFormat>()
            .map_err(|e| anyhow!("{ENV_LOG_FORMAT}: {e}"))?;
    }
    Ok(())
}

/// Every variable name referenced in a value tree, sorted, for diagnostics.
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    let mut vars = Vec::new();
    collect_vars_recursive(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

fn collect_vars_recursive(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for caps in ENV_VAR_PATTERN.captures_iter(s) {
                if caps.get(1).is_none() {
                    out.push(caps[2].to_string());
                }
            }
        }
        Value::Array(arr) => arr.iter().for_each(|v| collect_vars_recursive(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_vars_recursive(v, out)),
        _ => {}
    }
}
