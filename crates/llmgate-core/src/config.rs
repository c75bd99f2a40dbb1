//! Configuration management
//!
//! All tunables live in explicit structs with documented defaults and are
//! injected into the components that need them. Nothing here is global
//! mutable state, so deployments and tests can swap any section freely.

use crate::cost::PricingTable;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Inference backend connection settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Retry and model-fallback settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retrieval-augmented generation settings
    #[serde(default)]
    pub rag: RagConfig,

    /// Per-model cost rates for cost estimation
    #[serde(default)]
    pub pricing: PricingTable,
}

/// Inference backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the inference service
    pub url: String,

    /// Default model for text generation
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for embedding generation
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("LLMGATE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: default_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_model() -> String {
    std::env::var("LLMGATE_MODEL").unwrap_or_else(|_| "llama3".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("LLMGATE_EMBEDDING_MODEL").unwrap_or_else(|_| "llama3".to_string())
}

fn default_timeout() -> u64 {
    120
}

/// Retry and fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per model before moving down the fallback chain
    #[serde(default = "default_max_retries")]
    pub max_retries_per_model: u32,

    /// Models tried, in order, after the primary model is exhausted
    #[serde(default = "default_fallback_models")]
    pub fallback_models: Vec<String>,

    /// Base backoff delay; attempt N waits `base * 2^N`
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound on a single backoff delay
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries_per_model: default_max_retries(),
            fallback_models: default_fallback_models(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_fallback_models() -> Vec<String> {
    vec![
        "llama2".to_string(),
        "mistral".to_string(),
        "llama3".to_string(),
    ]
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether dispatch consults and populates the cache
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Default entry lifetime in seconds
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            default_ttl_secs: default_ttl(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_ttl() -> i64 {
    3600
}

/// Retrieval-augmented generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Words per document chunk (non-overlapping windows)
    #[serde(default = "default_chunk_size")]
    pub chunk_size_words: usize,

    /// Chunks returned by retrieval when the caller does not specify
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Per-chunk embedding timeout; a stalled embedding call leaves the
    /// chunk unembedded instead of hanging ingestion
    #[serde(default = "default_embed_timeout")]
    pub embed_timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size_words: default_chunk_size(),
            default_top_k: default_top_k(),
            embed_timeout_secs: default_embed_timeout(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}

fn default_top_k() -> usize {
    3
}

fn default_embed_timeout() -> u64 {
    30
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retry.max_retries_per_model, 3);
        assert_eq!(config.cache.default_ttl_secs, 3600);
        assert_eq!(config.rag.chunk_size_words, 500);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "retry:\n  max_retries_per_model: 5\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.retry.max_retries_per_model, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.rag.default_top_k, 3);
    }
}
