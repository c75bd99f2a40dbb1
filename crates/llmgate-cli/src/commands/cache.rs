//! Cache maintenance commands

use crate::app::{CacheAction, CacheArgs, OutputFormat};
use anyhow::Result;
use llmgate_core::Orchestrator;

pub async fn run(args: CacheArgs, gate: &Orchestrator, format: OutputFormat) -> Result<()> {
    match args.action {
        CacheAction::Stats => {
            let stats = gate.cache_stats()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Cli => {
                    println!("Entries:         {}", stats.total_entries);
                    println!("  Expired:       {}", stats.expired_entries);
                    println!("Total hits:      {}", stats.total_hits);
                    println!("Avg hits/entry:  {:.2}", stats.avg_hits);
                }
            }
        }
        CacheAction::Sweep => {
            let removed = gate.cache_sweep()?;
            println!("Removed {removed} expired entries");
        }
        CacheAction::Invalidate { pattern } => {
            let removed = gate.cache_invalidate(pattern.as_deref())?;
            match pattern {
                Some(pattern) => println!("Invalidated {removed} entries matching '{pattern}'"),
                None => println!("Invalidated all {removed} entries"),
            }
        }
    }
    Ok(())
}
