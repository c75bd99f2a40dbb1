//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "llmgate")]
#[command(
    author,
    version,
    about = "Local LLM orchestration: caching, retries, fallback, RAG and model comparison"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// User the operation runs as
    #[arg(long, global = true, env = "LLMGATE_USER", default_value = "1")]
    pub user: i64,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a completion
    Generate(GenerateArgs),

    /// Manage the document corpus and ask grounded questions
    Rag(RagArgs),

    /// Run one prompt against several models
    Compare(CompareArgs),

    /// Rate a comparison response
    Rate(RateArgs),

    /// Model leaderboard from comparison history
    Rankings(RankingsArgs),

    /// Manage the response cache
    Cache(CacheArgs),

    /// Usage statistics across all subsystems
    Stats,

    /// List models available on the backend
    Models,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// The prompt
    pub prompt: Vec<String>,

    /// Model to use (configured default when omitted)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Sampling temperature
    #[arg(short, long, default_value = "0.7")]
    pub temperature: f64,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

#[derive(Args)]
pub struct RagArgs {
    #[command(subcommand)]
    pub action: RagAction,
}

#[derive(Subcommand)]
pub enum RagAction {
    /// Ingest a document from a file
    Add {
        path: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Retrieve the most relevant chunks for a query
    Search {
        query: Vec<String>,
        #[arg(short = 'n', long)]
        top_k: Option<usize>,
    },
    /// Answer a question from the document corpus
    Ask {
        query: Vec<String>,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(short = 'n', long)]
        top_k: Option<usize>,
    },
    /// List ingested documents
    Ls,
    /// Remove a document
    #[command(alias = "rm")]
    Remove { document_id: i64 },
}

#[derive(Args)]
pub struct CompareArgs {
    /// The prompt
    pub prompt: Vec<String>,

    /// Models to compare (at least two)
    #[arg(short, long, required = true, num_args = 2..)]
    pub models: Vec<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Sampling temperature
    #[arg(short, long, default_value = "0.7")]
    pub temperature: f64,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

#[derive(Args)]
pub struct RateArgs {
    /// Response id from a comparison
    pub response_id: i64,

    /// Rating: -1, 0 or 1
    #[arg(allow_hyphen_values = true)]
    pub rating: i32,
}

#[derive(Args)]
pub struct RankingsArgs {
    /// Trailing window in days
    #[arg(long, default_value = "30")]
    pub days: i64,

    /// Rank across all users instead of just yours
    #[arg(long)]
    pub all_users: bool,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Cache usage statistics
    Stats,
    /// Remove expired entries
    Sweep,
    /// Remove entries whose prompt matches a pattern, or everything
    Invalidate {
        #[arg(long)]
        pattern: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
