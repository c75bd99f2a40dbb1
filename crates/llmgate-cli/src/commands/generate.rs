//! Generate command

use crate::app::{GenerateArgs, OutputFormat};
use anyhow::Result;
use llmgate_core::{GenerationRequest, Orchestrator};

pub async fn run(args: GenerateArgs, gate: &Orchestrator, format: OutputFormat) -> Result<()> {
    let prompt = args.prompt.join(" ");
    if prompt.trim().is_empty() {
        anyhow::bail!("prompt is empty");
    }

    let model = args.model.as_deref().unwrap_or(gate.default_model());
    let mut request = GenerationRequest::new(model, prompt).with_temperature(args.temperature);
    if let Some(system) = args.system {
        request = request.with_system(system);
    }
    if let Some(max_tokens) = args.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }

    let outcome = gate.generate(&request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Cli => {
            println!("{}", outcome.text);
            if outcome.cached {
                eprintln!("(cached)");
            } else {
                eprintln!(
                    "(model: {}{}, attempts: {}, {} ms, ~${:.6})",
                    outcome.model_used,
                    if outcome.fallback_used { " via fallback" } else { "" },
                    outcome.attempts,
                    outcome.duration_ms,
                    outcome.estimated_cost,
                );
            }
        }
    }
    Ok(())
}
