//! `iamgen generate`: write a least-privilege policy for a manifest.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use iamgen_policy::GroupBy;
use tracing::warn;

use crate::input::read_manifest;
use crate::pipeline::Pipeline;
use crate::terminal_output::note_success;

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Resource manifest (JSON or YAML)
    pub manifest: PathBuf,
    /// Write the policy here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Statement grouping: flat, service, or resource
    #[arg(long)]
    pub group_by: Option<GroupBy>,
    /// Scope a resource type to an ARN, as TYPE=ARN (repeatable)
    #[arg(long = "arn", value_name = "TYPE=ARN", value_parser = parse_arn_override)]
    pub arns: Vec<(String, String)>,
    /// Minified JSON output
    #[arg(long)]
    pub compact: bool,
    /// Print generation metadata to stderr
    #[arg(long)]
    pub metadata: bool,
}

pub fn parse_arn_override(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((resource_type, arn)) if !resource_type.trim().is_empty() && !arn.trim().is_empty() => {
            Ok((resource_type.trim().to_string(), arn.trim().to_string()))
        }
        _ => Err(format!("expected TYPE=ARN, got '{s}'")),
    }
}

pub fn run(pipeline: &Pipeline, args: &GenerateArgs) -> Result<()> {
    let resources = read_manifest(&args.manifest)?;

    let mut options = pipeline.settings.generation.to_options();
    if let Some(group_by) = args.group_by {
        options.group_by = group_by;
    }
    options.resource_arns.extend(args.arns.iter().cloned());
    let generator = pipeline.generator(options);

    let gaps = generator.analyze_gaps(&resources);
    if !gaps.is_empty() {
        warn!(types = %gaps.join(", "), "Skipped resource types without mappings");
    }

    let (policy, metadata) = generator.generate_policy(Some(resources.as_slice()))?;
    for warning in generator.validate_policy(Some(&policy))? {
        warn!(path = %warning.path, "{}", warning.message);
    }

    let json = if args.compact {
        policy.to_compact_json()?
    } else {
        policy.to_json()?
    };
    match &args.output {
        Some(path) => {
            fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write policy file: {}", path.display()))?;
            note_success(&format!("Policy written to {}", path.display()));
        }
        None => println!("{json}"),
    }

    if args.metadata {
        eprintln!("{}", serde_json::to_string_pretty(&metadata)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arn_overrides() {
        assert_eq!(
            parse_arn_override("aws_s3_bucket=arn:aws:s3:::logs").unwrap(),
            ("aws_s3_bucket".to_string(), "arn:aws:s3:::logs".to_string())
        );
        assert!(parse_arn_override("aws_s3_bucket").is_err());
        assert!(parse_arn_override("=arn:aws:s3:::logs").is_err());
        assert!(parse_arn_override("aws_s3_bucket= ").is_err());
    }
}
