//! Stats command

use crate::app::OutputFormat;
use anyhow::Result;
use llmgate_core::Orchestrator;

pub async fn run(gate: &Orchestrator, format: OutputFormat) -> Result<()> {
    let cache = gate.cache_stats()?;
    let retry = gate.retry_stats()?;
    let failure_rate = gate.retry_failure_rate(24)?;
    let rag = gate.rag_stats()?;
    let comparisons = gate.comparison_statistics(None)?;

    match format {
        OutputFormat::Json => {
            let combined = serde_json::json!({
                "cache": cache,
                "retry": retry,
                "retry_failure_rate_24h": failure_rate,
                "rag": rag,
                "comparisons": comparisons,
            });
            println!("{}", serde_json::to_string_pretty(&combined)?);
        }
        OutputFormat::Cli => {
            println!("Cache:");
            println!("  Entries:       {}", cache.total_entries);
            println!("  Total hits:    {}", cache.total_hits);
            println!();
            println!("Dispatch (24h):");
            println!("  Requests:      {}", retry.total_requests);
            println!("  Failures:      {}", retry.failed_attempts);
            println!("  Failure rate:  {:.1}%", failure_rate * 100.0);
            println!("  Avg duration:  {:.0} ms", retry.avg_duration_ms);
            println!();
            println!("Documents:");
            println!("  Documents:     {}", rag.total_documents);
            println!("  Chunks:        {}", rag.total_chunks);
            println!("  Embedded:      {}", rag.embedded_chunks);
            println!();
            println!("Comparisons:");
            println!("  Total:         {}", comparisons.total_comparisons);
            println!("  Models seen:   {}", comparisons.unique_models_compared);
            for entry in &comparisons.most_compared_models {
                println!("    {:<18} {}", entry.model, entry.count);
            }
        }
    }
    Ok(())
}
