//! Settings validation with path-tagged messages.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::schema::Settings;

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(settings: &Settings) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_mappings(settings, &mut report);
    validate_generation(settings, &mut report);
    validate_logging(settings, &mut report);
    report
}

fn validate_mappings(settings: &Settings, report: &mut ValidationReport) {
    if settings.mappings_dirs.is_empty() {
        report.error("mappings_dirs", "At least one mappings directory is required");
    }
    for (i, dir) in settings.mappings_dirs.iter().enumerate() {
        let path = format!("mappings_dirs[{i}]");
        if dir.as_os_str().is_empty() {
            report.error(path, "Mappings directory cannot be empty");
        } else if !dir.is_dir() {
            report.warn(path, format!("Directory {} does not exist", dir.display()));
        }
    }
}

fn validate_generation(settings: &Settings, report: &mut ValidationReport) {
    let generation = &settings.generation;
    for (resource_type, arn) in &generation.resource_arns {
        if arn.trim().is_empty() {
            report.error(
                format!("generation.resource_arns.{resource_type}"),
                "ARN override cannot be empty",
            );
        }
    }
    if !generation.use_wildcard_resources && generation.resource_arns.is_empty() {
        report.warn(
            "generation.use_wildcard_resources",
            "Wildcard resources disabled but no resource_arns given; statements will still use \"*\"",
        );
    }
}

/// A bare level name, or a `target=level` filter directive list.
///
/// A bare word that is not a level is rejected even though `EnvFilter`
/// would read it as a target name.
fn is_valid_level(level: &str) -> bool {
    let trimmed = level.trim();
    if LOG_LEVELS.contains(&trimmed.to_ascii_lowercase().as_str()) {
        return true;
    }
    trimmed.contains('=') && EnvFilter::try_new(trimmed).is_ok()
}

fn validate_logging(settings: &Settings, report: &mut ValidationReport) {
    if !is_valid_level(&settings.logging.level) {
        report.error(
            "logging.level",
            format!(
                "Unknown log level '{}'. Use one of: {}, or directives like 'iamgen_policy=debug,warn'",
                settings.logging.level,
                LOG_LEVELS.join(", ")
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings_in(dir: &std::path::Path) -> Settings {
        Settings {
            mappings_dirs: vec![dir.to_path_buf()],
            ..Default::default()
        }
    }

    #[test]
    fn existing_dir_and_defaults_are_clean() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate(&settings_in(dir.path()));
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_dir_is_warning() {
        let mut settings = Settings::default();
        settings.mappings_dirs = vec![PathBuf::from("/definitely/not/here")];
        let report = validate(&settings);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "mappings_dirs[0]");
    }

    #[test]
    fn empty_entries_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        settings.mappings_dirs.push(PathBuf::new());
        settings
            .generation
            .resource_arns
            .insert("aws_s3_bucket".into(), " ".into());
        settings.logging.level = "loud".into();

        let report = validate(&settings);
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "mappings_dirs[1]",
                "generation.resource_arns.aws_s3_bucket",
                "logging.level"
            ]
        );
    }

    #[test]
    fn wildcard_disabled_without_arns_warns() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        settings.generation.use_wildcard_resources = false;
        let report = validate(&settings);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path, "generation.use_wildcard_resources");
    }

    #[test]
    fn level_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        settings.logging.level = "DEBUG".into();
        assert!(validate(&settings).is_valid());
    }

    #[test]
    fn filter_directives_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        settings.logging.level = "iamgen_policy=debug,warn".into();
        assert!(validate(&settings).is_valid());

        settings.logging.level = "iamgen_policy=chatty".into();
        assert_eq!(validate(&settings).errors[0].path, "logging.level");
    }
}
