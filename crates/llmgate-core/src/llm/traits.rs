//! Inference backend trait definitions
//!
//! The backend is a black box keyed by open-ended model id strings; model
//! validity is the backend's concern, not a closed enum here.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single generation request with explicit defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Same request aimed at a different model (used when walking the
    /// fallback chain)
    pub fn for_model(&self, model: &str) -> Self {
        let mut request = self.clone();
        request.model = model.to_string();
        request
    }
}

/// Completed generation with usage metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub prompt_tokens: u32,
    pub response_tokens: u32,
    pub duration_ms: u64,
}

/// Text generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion. Transient backend failures surface as
    /// `LlmGateError::Inference` and are retryable.
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;
}

/// Embedding generation capability
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding vector. An unreachable embedding service
    /// surfaces as `LlmGateError::EmbeddingUnavailable`.
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>>;
}
