//! llmgate CLI
//!
//! Orchestrated access to a local LLM backend.

use anyhow::Result;
use clap::Parser;
use llmgate_core::{Config, Database, Orchestrator};

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; --verbose lowers the default level, RUST_LOG
    // still overrides either way
    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    // Open database (use LLMGATE_DB env var if set, otherwise use default)
    let db_path = std::env::var("LLMGATE_DB")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| Database::default_path());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open(&db_path)?;
    db.initialize()?;
    tracing::debug!(path = %db_path.display(), "database ready");

    let config = Config::load()?;
    let gate = Orchestrator::new(config, db)?;

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args, &gate, cli.format).await,
        Commands::Rag(args) => commands::rag::run(args, &gate, cli.user, cli.format).await,
        Commands::Compare(args) => commands::compare::run(args, &gate, cli.user, cli.format).await,
        Commands::Rate(args) => commands::compare::run_rate(args, &gate, cli.user).await,
        Commands::Rankings(args) => {
            commands::compare::run_rankings(args, &gate, cli.user, cli.format).await
        }
        Commands::Cache(args) => commands::cache::run(args, &gate, cli.format).await,
        Commands::Stats => commands::stats::run(&gate, cli.format).await,
        Commands::Models => commands::models::run(&gate, cli.format).await,
    }
}
