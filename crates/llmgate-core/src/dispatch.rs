//! Retry/fallback dispatcher
//!
//! Wraps one logical generation call: cache lookup, bounded retries with
//! exponential backoff per model, then an ordered fallback chain. Every
//! attempt is logged under a single request id. Backoff only suspends the
//! dispatching task; concurrent dispatches are unaffected.

use crate::config::{CacheConfig, RetryConfig};
use crate::cost::PricingTable;
use crate::db::Database;
use crate::error::{LlmGateError, Result};
use crate::llm::{fingerprint, GenerationRequest, TextGenerator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One attempt within a dispatch, kept in memory for the terminal error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub model: String,
    pub attempt: u32,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Successful dispatch result with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub text: String,
    pub model_used: String,
    pub attempts: u32,
    pub fallback_used: bool,
    pub cached: bool,
    pub request_id: Option<String>,
    pub prompt_tokens: u32,
    pub response_tokens: u32,
    pub duration_ms: u64,
    pub estimated_cost: f64,
}

/// Retry/fallback dispatcher over a generation backend
pub struct Dispatcher {
    generator: Arc<dyn TextGenerator>,
    retry: RetryConfig,
    cache: CacheConfig,
    pricing: PricingTable,
}

impl Dispatcher {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        retry: RetryConfig,
        cache: CacheConfig,
        pricing: PricingTable,
    ) -> Self {
        Self {
            generator,
            retry,
            cache,
            pricing,
        }
    }

    /// Dispatch one generation request.
    ///
    /// `fallback_chain` is tried in order after the primary model's retry
    /// budget is exhausted; duplicates of the primary (or of earlier chain
    /// entries) are skipped so no model is attempted twice. `deadline`
    /// bounds the whole dispatch; once exceeded the chain stops with a
    /// timeout error instead of continuing.
    pub async fn dispatch(
        &self,
        db: &Database,
        request: &GenerationRequest,
        fallback_chain: &[String],
        deadline: Option<Duration>,
    ) -> Result<DispatchOutcome> {
        let cache_key = fingerprint(request);

        if self.cache.enabled {
            if let Some(cached) = db.cache_get(&cache_key)? {
                tracing::debug!(model = %request.model, "cache hit");
                return Ok(DispatchOutcome {
                    text: cached,
                    model_used: request.model.clone(),
                    attempts: 0,
                    fallback_used: false,
                    cached: true,
                    request_id: None,
                    prompt_tokens: 0,
                    response_tokens: 0,
                    duration_ms: 0,
                    estimated_cost: 0.0,
                });
            }
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        let mut models: Vec<&str> = vec![request.model.as_str()];
        for fallback in fallback_chain {
            if !models.contains(&fallback.as_str()) {
                models.push(fallback.as_str());
            }
        }

        for model in models {
            let attempt_request = request.for_model(model);

            for attempt in 0..self.retry.max_retries_per_model {
                let remaining = match remaining_time(deadline, started) {
                    Ok(remaining) => remaining,
                    Err(e) => return Err(e),
                };

                let attempt_started = Instant::now();
                let result = match remaining {
                    Some(budget) => {
                        match tokio::time::timeout(budget, self.generator.generate(&attempt_request))
                            .await
                        {
                            Ok(inner) => inner,
                            Err(_) => {
                                let duration_ms = attempt_started.elapsed().as_millis() as u64;
                                db.log_retry_attempt(
                                    &request_id,
                                    model,
                                    attempt + 1,
                                    false,
                                    Some("deadline exceeded"),
                                    duration_ms,
                                )?;
                                return Err(LlmGateError::Timeout(format!(
                                    "dispatch {} exceeded its deadline on {} (attempt {})",
                                    request_id,
                                    model,
                                    attempt + 1
                                )));
                            }
                        }
                    }
                    None => self.generator.generate(&attempt_request).await,
                };
                let duration_ms = attempt_started.elapsed().as_millis() as u64;

                match result {
                    Ok(generation) => {
                        db.log_retry_attempt(&request_id, model, attempt + 1, true, None, duration_ms)?;

                        if self.cache.enabled {
                            db.cache_put(
                                &cache_key,
                                request,
                                &generation.text,
                                Some(self.cache.default_ttl_secs),
                            )?;
                        }

                        let fallback_used = model != request.model;
                        if fallback_used {
                            tracing::info!(
                                primary = %request.model,
                                used = %model,
                                "fallback model produced the response"
                            );
                        }

                        return Ok(DispatchOutcome {
                            estimated_cost: self.pricing.cost(
                                model,
                                generation.prompt_tokens,
                                generation.response_tokens,
                            ),
                            text: generation.text,
                            model_used: model.to_string(),
                            attempts: attempt + 1,
                            fallback_used,
                            cached: false,
                            request_id: Some(request_id),
                            prompt_tokens: generation.prompt_tokens,
                            response_tokens: generation.response_tokens,
                            duration_ms: generation.duration_ms,
                        });
                    }
                    Err(e) => {
                        let message = e.to_string();
                        tracing::warn!(
                            model,
                            attempt = attempt + 1,
                            error = %message,
                            "generation attempt failed"
                        );
                        db.log_retry_attempt(
                            &request_id,
                            model,
                            attempt + 1,
                            false,
                            Some(&message),
                            duration_ms,
                        )?;
                        attempts.push(AttemptRecord {
                            model: model.to_string(),
                            attempt: attempt + 1,
                            success: false,
                            error: Some(message),
                            duration_ms,
                        });

                        // Retrying cannot fix a validation or permission
                        // failure; surface it instead of burning the chain
                        if !e.is_transient() {
                            return Err(e);
                        }

                        if attempt + 1 < self.retry.max_retries_per_model {
                            let mut delay = backoff_delay(attempt, &self.retry);
                            if let Some(budget) = remaining_time(deadline, started)? {
                                delay = delay.min(budget);
                            }
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        Err(LlmGateError::ExhaustedFallback {
            request_id,
            attempts,
        })
    }
}

/// Backoff before retry `attempt + 1`: `base * 2^attempt`, capped
pub fn backoff_delay(attempt: u32, retry: &RetryConfig) -> Duration {
    let exp = retry
        .base_delay_ms
        .saturating_mul(1u64 << attempt.min(20));
    Duration::from_millis(exp.min(retry.max_delay_ms))
}

fn remaining_time(deadline: Option<Duration>, started: Instant) -> Result<Option<Duration>> {
    match deadline {
        None => Ok(None),
        Some(deadline) => {
            let elapsed = started.elapsed();
            if elapsed >= deadline {
                Err(LlmGateError::Timeout(
                    "dispatch deadline exceeded".to_string(),
                ))
            } else {
                Ok(Some(deadline - elapsed))
            }
        }
    }
}
