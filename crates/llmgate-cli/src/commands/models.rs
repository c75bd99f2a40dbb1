//! Models command

use crate::app::OutputFormat;
use anyhow::Result;
use llmgate_core::{Orchestrator, OllamaClient};

pub async fn run(gate: &Orchestrator, format: OutputFormat) -> Result<()> {
    let client = OllamaClient::new(&gate.config().inference)?;

    if !client.is_running().await {
        anyhow::bail!(
            "inference backend at {} is not responding",
            gate.config().inference.url
        );
    }

    let models = client.list_models().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&models)?),
        OutputFormat::Cli => {
            if models.is_empty() {
                println!("No models installed.");
            }
            for model in models {
                let size_gb = model.size as f64 / 1_073_741_824.0;
                println!("{:<30} {:>8.1} GB", model.name, size_gb);
            }
        }
    }
    Ok(())
}
