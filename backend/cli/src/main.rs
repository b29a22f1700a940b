mod analyze_cmd;
mod generate_cmd;
mod input;
mod mappings_cmd;
mod pipeline;
mod terminal_output;
mod validate_cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use analyze_cmd::AnalyzeArgs;
use generate_cmd::GenerateArgs;
use mappings_cmd::MappingsArgs;
use pipeline::Pipeline;
use validate_cmd::ValidateArgs;

#[derive(Parser)]
#[command(name = "iamgen")]
#[command(about = "iamgen: least-privilege IAM policies from declared infrastructure")]
#[command(version)]
struct Cli {
    /// Settings file (default: $IAMGEN_CONFIG or ./iamgen.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a resource manifest
    Analyze(AnalyzeArgs),
    /// Generate a policy for a resource manifest
    Generate(GenerateArgs),
    /// Lint an existing policy document
    Validate(ValidateArgs),
    /// Show knowledge base statistics
    Mappings(MappingsArgs),
    /// Print the version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(iamgen_config::config_file_path);
    let prepared = iamgen_config::load_and_prepare(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;
    iamgen_logging::init_logger(&prepared.settings.logging)?;
    debug!(config = %config_path.display(), "Settings loaded");
    prepared.log_warnings();
    let settings = prepared.settings;

    match cli.command {
        Commands::Analyze(args) => analyze_cmd::run(&Pipeline::load(settings)?, &args),
        Commands::Generate(args) => generate_cmd::run(&Pipeline::load(settings)?, &args),
        Commands::Validate(args) => validate_cmd::run(&settings, &args),
        Commands::Mappings(args) => mappings_cmd::run(&Pipeline::load(settings)?, &args),
        Commands::Version => {
            println!("iamgen {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
