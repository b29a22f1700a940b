//! `iamgen validate`: lint an existing policy document.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use iamgen_config::Settings;
use iamgen_policy::{validate, Policy};

use crate::terminal_output::{note_success, note_warn};

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Policy document (JSON)
    pub policy: PathBuf,
}

pub fn run(settings: &Settings, args: &ValidateArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.policy)
        .with_context(|| format!("Failed to read policy: {}", args.policy.display()))?;
    let policy = Policy::from_json(&raw)
        .with_context(|| format!("Not a policy document: {}", args.policy.display()))?;

    let warnings = validate(Some(&policy), settings.generation.use_wildcard_resources)?;
    if warnings.is_empty() {
        note_success(&format!(
            "{}: {} statement(s), no issues",
            args.policy.display(),
            policy.statements().len()
        ));
    }
    for warning in &warnings {
        note_warn(&warning.to_string());
    }
    Ok(())
}
