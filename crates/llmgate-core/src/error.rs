//! Error types for llmgate

use crate::dispatch::AttemptRecord;
use thiserror::Error;

/// Result type alias using LlmGateError
pub type Result<T> = std::result::Result<T, LlmGateError>;

/// Error type alias for convenience
pub type Error = LlmGateError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const PERMISSION_DENIED: i32 = 4;
}

/// Main error type for llmgate
#[derive(Debug, Error)]
pub enum LlmGateError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Transient backend failure. Retried by the dispatcher, never
    /// surfaced to callers on its own.
    #[error("Inference error ({model}): {message}")]
    Inference { model: String, message: String },

    /// Terminal dispatch failure: every model in the chain exhausted its
    /// retry budget. Carries the full attempt history.
    #[error("All models exhausted for request {request_id} after {} attempts", attempts.len())]
    ExhaustedFallback {
        request_id: String,
        attempts: Vec<AttemptRecord>,
    },

    /// The embedding capability cannot be reached. Retrieval degrades to
    /// keyword scoring instead of failing.
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(i64),

    #[error("Comparison not found: {0}")]
    ComparisonNotFound(i64),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmGateError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DocumentNotFound(_) | Self::ComparisonNotFound(_) => exit_codes::NOT_FOUND,
            Self::Validation(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::Permission(_) => exit_codes::PERMISSION_DENIED,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Whether the dispatcher may retry after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Inference { .. } | Self::Http(_))
    }
}
