//! Multi-model comparison
//!
//! One prompt goes to every requested model; each model is dispatched on
//! its own, with no fallback chain, so a response row always belongs to
//! the model it names. A model's failure is recorded, not propagated: the
//! comparison as a whole succeeds as long as at least one model answers.

use crate::db::{ComparisonRecord, ComparisonStats, Database, ModelRanking};
use crate::dispatch::Dispatcher;
use crate::error::{LlmGateError, Result};
use crate::llm::GenerationRequest;
use std::time::Instant;

/// Run a prompt against several models and persist every outcome.
///
/// Returns the stored comparison, responses ordered fastest-first.
#[allow(clippy::too_many_arguments)]
pub async fn compare_models(
    db: &Database,
    dispatcher: &Dispatcher,
    user_id: i64,
    models: &[String],
    prompt: &str,
    system_prompt: Option<&str>,
    temperature: f64,
    max_tokens: Option<u32>,
) -> Result<ComparisonRecord> {
    let mut unique: Vec<&str> = Vec::new();
    for model in models {
        if !unique.contains(&model.as_str()) {
            unique.push(model);
        }
    }
    if unique.len() < 2 {
        return Err(LlmGateError::Validation(
            "a comparison needs at least two distinct models".to_string(),
        ));
    }

    let comparison_id = db.insert_comparison(user_id, prompt, system_prompt, temperature)?;
    tracing::info!(comparison_id, models = unique.len(), "comparison started");

    let mut successes = 0usize;
    for model in &unique {
        let mut request = GenerationRequest::new(*model, prompt).with_temperature(temperature);
        if let Some(system) = system_prompt {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        // Empty fallback chain: the row must reflect this model alone
        let started = Instant::now();
        match dispatcher.dispatch(db, &request, &[], None).await {
            Ok(outcome) => {
                db.insert_comparison_response(
                    comparison_id,
                    model,
                    Some(&outcome.text),
                    outcome.duration_ms,
                    u64::from(outcome.response_tokens),
                    None,
                )?;
                successes += 1;
            }
            Err(e) => {
                // A failing model still spent wall-clock time (retries and
                // backoff included); rankings must see it
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(model, error = %e, duration_ms, "model failed during comparison");
                db.insert_comparison_response(
                    comparison_id,
                    model,
                    None,
                    duration_ms,
                    0,
                    Some(&e.to_string()),
                )?;
            }
        }
    }

    tracing::info!(
        comparison_id,
        successes,
        failures = unique.len() - successes,
        "comparison complete"
    );

    db.get_comparison(comparison_id, user_id)?
        .ok_or(LlmGateError::ComparisonNotFound(comparison_id))
}

/// Record the user's verdict on one response: -1, 0 or 1.
/// Re-rating overwrites the previous value.
pub fn rate_response(db: &Database, user_id: i64, response_id: i64, rating: i32) -> Result<()> {
    if !(-1..=1).contains(&rating) {
        return Err(LlmGateError::Validation(format!(
            "rating must be -1, 0 or 1, got {rating}"
        )));
    }

    match db.response_owner(response_id)? {
        None => Err(LlmGateError::Validation(format!(
            "response {response_id} does not exist"
        ))),
        Some(owner) if owner != user_id => Err(LlmGateError::Permission(format!(
            "response {response_id} belongs to another user's comparison"
        ))),
        Some(_) => db.set_response_rating(response_id, rating),
    }
}

/// Delete a comparison the user owns; responses cascade
pub fn delete_comparison(db: &Database, user_id: i64, comparison_id: i64) -> Result<()> {
    match db.comparison_owner(comparison_id)? {
        None => Err(LlmGateError::ComparisonNotFound(comparison_id)),
        Some(owner) if owner != user_id => Err(LlmGateError::Permission(format!(
            "comparison {comparison_id} belongs to another user"
        ))),
        Some(_) => {
            db.delete_comparison_row(comparison_id)?;
            Ok(())
        }
    }
}

/// Per-model leaderboard over the trailing window
pub fn rankings(db: &Database, user_id: Option<i64>, days: i64) -> Result<Vec<ModelRanking>> {
    db.model_rankings(user_id, days)
}

/// Comparison usage statistics
pub fn statistics(db: &Database, user_id: Option<i64>) -> Result<ComparisonStats> {
    db.comparison_statistics(user_id)
}
