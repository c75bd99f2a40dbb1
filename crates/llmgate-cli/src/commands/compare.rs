//! Comparison commands

use crate::app::{CompareArgs, OutputFormat, RankingsArgs, RateArgs};
use anyhow::Result;
use llmgate_core::Orchestrator;

pub async fn run(args: CompareArgs, gate: &Orchestrator, user: i64, format: OutputFormat) -> Result<()> {
    let prompt = args.prompt.join(" ");
    if prompt.trim().is_empty() {
        anyhow::bail!("prompt is empty");
    }

    let record = gate
        .compare(
            user,
            &args.models,
            &prompt,
            args.system.as_deref(),
            args.temperature,
            args.max_tokens,
        )
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Cli => {
            println!("Comparison {} ({} models)", record.id, record.responses.len());
            for response in &record.responses {
                println!();
                match (&response.response, &response.error) {
                    (Some(text), _) => {
                        println!(
                            "=== {} ({} ms, {} tokens) [response {}]",
                            response.model, response.duration_ms, response.token_count, response.id
                        );
                        println!("{text}");
                    }
                    (None, Some(error)) => {
                        println!("=== {} FAILED [response {}]", response.model, response.id);
                        println!("{error}");
                    }
                    (None, None) => {
                        println!("=== {} (empty) [response {}]", response.model, response.id);
                    }
                }
            }
            eprintln!();
            eprintln!("Rate with: llmgate rate <response-id> <-1|0|1>");
        }
    }
    Ok(())
}

pub async fn run_rate(args: RateArgs, gate: &Orchestrator, user: i64) -> Result<()> {
    gate.rate_response(user, args.response_id, args.rating)?;
    println!("Rated response {} as {}", args.response_id, args.rating);
    Ok(())
}

pub async fn run_rankings(
    args: RankingsArgs,
    gate: &Orchestrator,
    user: i64,
    format: OutputFormat,
) -> Result<()> {
    let scope = if args.all_users { None } else { Some(user) };
    let board = gate.model_rankings(scope, args.days)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&board)?),
        OutputFormat::Cli => {
            if board.is_empty() {
                println!("No comparison data in the last {} days.", args.days);
                return Ok(());
            }
            println!(
                "{:<20} {:>6} {:>8} {:>8} {:>10} {:>10}",
                "model", "runs", "+/-", "rated", "satisfied", "avg ms"
            );
            for entry in board {
                println!(
                    "{:<20} {:>6} {:>4}/{:<3} {:>8} {:>10} {:>10.0}",
                    entry.model,
                    entry.total_responses,
                    entry.positive_ratings,
                    entry.negative_ratings,
                    entry.total_ratings,
                    entry
                        .satisfaction_rate
                        .map(|r| format!("{:.0}%", r * 100.0))
                        .unwrap_or_else(|| "-".to_string()),
                    entry.avg_duration_ms,
                );
            }
        }
    }
    Ok(())
}
