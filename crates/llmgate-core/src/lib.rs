//! llmgate-core: request orchestration for local LLM backends
//!
//! The core wraps an Ollama-compatible inference service with the plumbing
//! a production caller needs: a deterministic response cache, retries with
//! exponential backoff and a model-fallback chain, retrieval-augmented
//! generation over a per-user document corpus, and side-by-side
//! multi-model comparison with user ratings.
//!
//! Everything persists in a single SQLite database. [`Orchestrator`] is
//! the high-level entry point; the individual layers are public for
//! callers that need finer control.

pub mod compare;
pub mod config;
pub mod cost;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod rag;

pub use config::Config;
pub use db::Database;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{LlmGateError, Result};
pub use llm::{Embedder, Generation, GenerationRequest, OllamaClient, TextGenerator};
pub use orchestrator::Orchestrator;
pub use rag::{RagAnswer, RagEngine, SearchHit};

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "llmgate";

/// Directory name under the platform data dir
pub const DATA_DIR_NAME: &str = "llmgate";
