//! Structured Logger
//!
//! Wraps `tracing` to provide console output, optional file rotation (NDJSON),
//! and environment-based level control.

use anyhow::{Context, Result};
use iamgen_config::{LogFormat, LoggingSettings};
use tracing::debug;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Rolling files are named `iamgen.log.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "iamgen.log";

/// `RUST_LOG` wins over the configured level.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {level}")),
    }
}

/// Initialize the global logger from settings.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logger(settings: &LoggingSettings) -> Result<()> {
    let env_filter = build_filter(&settings.level)?;

    // stdout carries command output, so logs go to stderr
    let (pretty_layer, json_layer) = match settings.format {
        LogFormat::Pretty => (
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };

    let file_layer = match &settings.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    if installed {
        debug!(format = %settings.format, log_dir = ?settings.log_dir, "Logger initialized");
    }
    Ok(())
}
