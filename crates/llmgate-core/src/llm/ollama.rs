//! HTTP client for an Ollama-compatible inference backend

use crate::config::InferenceConfig;
use crate::error::{LlmGateError, Result};
use crate::llm::{Embedder, Generation, GenerationRequest, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Client for the Ollama REST API
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
}

/// Model listing entry from the backend catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: Option<String>,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    /// Create a client from configuration
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(LlmGateError::Http)?;

        Ok(Self {
            http_client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint)
    }

    /// Probe whether the backend answers at all
    pub async fn is_running(&self) -> bool {
        self.http_client
            .get(&self.base_url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    /// List the models available on the backend
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .http_client
            .get(self.api_url("tags"))
            .send()
            .await?
            .error_for_status()?;

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let started = Instant::now();

        let body = GenerateBody {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            system: request.system.as_deref(),
        };

        tracing::debug!(model = %request.model, "generate request");

        let response = self
            .http_client
            .post(self.api_url("generate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmGateError::Inference {
                model: request.model.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmGateError::Inference {
                model: request.model.clone(),
                message: format!("HTTP {}: {}", status, detail),
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| LlmGateError::Inference {
                model: request.model.clone(),
                message: format!("invalid response body: {}", e),
            })?;

        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(model = %request.model, duration_ms, "generate complete");

        Ok(Generation {
            prompt_tokens: parsed
                .prompt_eval_count
                .unwrap_or_else(|| estimate_tokens(&request.prompt)),
            response_tokens: parsed
                .eval_count
                .unwrap_or_else(|| estimate_tokens(&parsed.response)),
            text: parsed.response,
            duration_ms,
        })
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({ "model": model, "prompt": text });

        let response = self
            .http_client
            .post(self.api_url("embeddings"))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmGateError::EmbeddingUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmGateError::EmbeddingUnavailable(format!(
                "HTTP {}: {}",
                status, detail
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| LlmGateError::EmbeddingUnavailable(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(LlmGateError::EmbeddingUnavailable(format!(
                "model {} returned an empty embedding",
                model
            )));
        }

        Ok(parsed.embedding)
    }
}

/// Rough word-count token estimate when the backend omits usage counts
fn estimate_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
