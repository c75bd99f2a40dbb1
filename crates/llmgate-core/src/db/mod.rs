//! Database layer for llmgate
//!
//! SQLite-backed storage for the response cache, the retry attempt log,
//! the per-user document corpus and multi-model comparisons. Writes that
//! must be atomic (cache upserts, document + chunk ingestion) go through
//! single-statement upserts or explicit transactions.

mod schema;
mod cache;
mod retry_log;
mod documents;
mod comparisons;
pub mod vectors;

pub use cache::CacheStats;
pub use comparisons::{
    ComparisonRecord, ComparisonResponseRecord, ComparisonStats, ModelCount, ModelRanking,
};
pub use documents::{ChunkRecord, DocumentSummary, RagStats, StoredChunk};
pub use retry_log::{RetryLogRow, RetryStats};
pub use schema::Database;
pub(crate) use schema::now_rfc3339;
pub use vectors::{bytes_to_embedding, cosine_similarity, embedding_to_bytes};

use std::path::PathBuf;

impl Database {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::DATA_DIR_NAME)
            .join("llmgate.sqlite")
    }
}
