//! `iamgen analyze`: what a manifest declares and how much of it is mapped.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use iamgen_core::ResourceRecord;

use crate::input::read_manifest;
use crate::pipeline::Pipeline;
use crate::terminal_output::{paint, render_table, Column, BOLD, GREEN, RED};

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Resource manifest (JSON or YAML)
    pub manifest: PathBuf,
    /// Show mapping coverage and a policy preview
    #[arg(long)]
    pub coverage: bool,
}

pub fn run(pipeline: &Pipeline, args: &AnalyzeArgs) -> Result<()> {
    let resources = read_manifest(&args.manifest)?;
    println!("{}", summary(&resources));

    if !resources.is_empty() {
        println!("\nDiscovered Resources:");
        for resource in &resources {
            if resource.location.file.is_empty() {
                println!("  - {}", resource.full_name());
            } else {
                println!("  - {} ({})", resource.full_name(), resource.location);
            }
        }
    }

    if args.coverage && !resources.is_empty() {
        print_coverage(pipeline, &resources)?;
    }
    Ok(())
}

fn summary(resources: &[ResourceRecord]) -> String {
    let mut types: Vec<&str> = resources.iter().map(|r| r.resource_type.as_str()).collect();
    types.sort_unstable();
    types.dedup();
    format!(
        "Parsed {} resource(s) across {} resource type(s)",
        resources.len(),
        types.len()
    )
}

fn print_coverage(pipeline: &Pipeline, resources: &[ResourceRecord]) -> Result<()> {
    let generator = pipeline.default_generator();
    let report = generator.coverage(resources);

    println!("\n{}", paint(BOLD, "IAM Mapping Coverage"));
    let rows: Vec<Vec<String>> = report
        .counts_by_type
        .iter()
        .map(|(resource_type, count)| {
            let status = if report.unmapped_types.contains(resource_type) {
                paint(RED, "unmapped")
            } else {
                paint(GREEN, "mapped")
            };
            vec![resource_type.clone(), count.to_string(), status]
        })
        .collect();
    print!(
        "{}",
        render_table(
            &[Column::left("Type"), Column::right("Count"), Column::left("Status")],
            &rows
        )
    );
    println!(
        "\nCoverage: {}/{} resource types mapped ({:.1}%)",
        report.mapped_types, report.total_distinct_types, report.coverage_percent
    );

    let (policy, metadata) = generator.generate_policy(Some(resources))?;
    if !policy.statements().is_empty() {
        println!("\nGenerated Policy Preview:");
        println!("  Total Actions: {}", metadata.permission_count);
        println!("  Services: {}", metadata.services.join(", "));
        println!("  Statements: {}", policy.statements().len());
    }
    Ok(())
}
