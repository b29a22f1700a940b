//! `iamgen mappings`: inspect the loaded knowledge base.

use anyhow::Result;
use clap::Args;

use crate::pipeline::Pipeline;
use crate::terminal_output::{render_table, Column};

#[derive(Debug, Args)]
pub struct MappingsArgs {
    /// Show one resource type instead of the summary
    #[arg(long)]
    pub resource_type: Option<String>,
}

pub fn run(pipeline: &Pipeline, args: &MappingsArgs) -> Result<()> {
    if let Some(resource_type) = &args.resource_type {
        let info = pipeline.lookup.mapping_info(resource_type)?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let stats = pipeline.knowledge_base().stats();
    println!(
        "{} resource type(s), {} base action(s), {} service(s)\n",
        stats.total_mappings,
        stats.total_actions,
        stats.service_list.len()
    );
    let rows: Vec<Vec<String>> = stats
        .services
        .iter()
        .map(|(service, count)| vec![service.clone(), count.to_string()])
        .collect();
    print!(
        "{}",
        render_table(&[Column::left("Service"), Column::right("Types")], &rows)
    );
    Ok(())
}
