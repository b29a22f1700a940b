//! iamgen settings schema.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use iamgen_mapping::AttributeMode;
use iamgen_policy::{GenerationOptions, GroupBy};
use serde::{Deserialize, Serialize};

/// Root settings, read from `iamgen.yaml`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Knowledge-base directories, merged in order (later entries win).
    pub mappings_dirs: Vec<PathBuf>,
    pub generation: GenerationSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mappings_dirs: vec![PathBuf::from("mappings")],
            generation: GenerationSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSettings {
    pub group_by: GroupBy,
    pub use_wildcard_resources: bool,
    pub include_sids: bool,
    pub attribute_mode: AttributeMode,
    /// Resource type -> ARN pattern.
    pub resource_arns: BTreeMap<String, String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            group_by: GroupBy::Service,
            use_wildcard_resources: true,
            include_sids: true,
            attribute_mode: AttributeMode::Presence,
            resource_arns: BTreeMap::new(),
        }
    }
}

impl GenerationSettings {
    pub fn to_options(&self) -> GenerationOptions {
        GenerationOptions {
            group_by: self.group_by,
            use_wildcard_resources: self.use_wildcard_resources,
            include_sids: self.include_sids,
            resource_arns: self.resource_arns.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'. Use 'pretty' or 'json'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// trace | debug | info | warn | error
    pub level: String,
    pub format: LogFormat,
    /// When set, JSON logs also go to a daily-rolling file here.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            log_dir: None,
        }
    }
}
