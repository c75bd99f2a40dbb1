//! Orchestrator facade
//!
//! Single entry point tying the pieces together: one database handle, one
//! dispatcher, one retrieval engine, one configuration. Callers that need
//! the raw parts (the CLI's maintenance commands, tests) can reach them
//! through accessors.

use crate::compare;
use crate::config::Config;
use crate::db::{
    CacheStats, ComparisonRecord, ComparisonStats, Database, DocumentSummary, ModelRanking,
    RagStats, RetryStats,
};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::Result;
use crate::llm::{Embedder, GenerationRequest, OllamaClient, TextGenerator};
use crate::rag::{RagAnswer, RagEngine, SearchHit};
use std::sync::Arc;

pub struct Orchestrator {
    db: Database,
    dispatcher: Dispatcher,
    rag: RagEngine,
    config: Config,
}

impl Orchestrator {
    /// Wire up against the configured inference backend
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(&config.inference)?);
        Ok(Self::with_backend(config, db, client.clone(), client))
    }

    /// Wire up with explicit backend implementations
    pub fn with_backend(
        config: Config,
        db: Database,
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            generator,
            config.retry.clone(),
            config.cache.clone(),
            config.pricing.clone(),
        );
        let rag = RagEngine::new(
            embedder,
            config.inference.embedding_model.clone(),
            config.rag.clone(),
        );
        Self {
            db,
            dispatcher,
            rag,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Generate a completion with caching, retries and the configured
    /// fallback chain
    pub async fn generate(&self, request: &GenerationRequest) -> Result<DispatchOutcome> {
        self.dispatcher
            .dispatch(&self.db, request, &self.config.retry.fallback_models, None)
            .await
    }

    /// Default generation model from configuration
    pub fn default_model(&self) -> &str {
        &self.config.inference.model
    }

    // --- retrieval ---

    pub async fn add_document(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        source: Option<&str>,
        metadata: Option<&str>,
    ) -> Result<i64> {
        self.rag
            .add_document(&self.db, user_id, title, content, source, metadata)
            .await
    }

    pub async fn search_documents(
        &self,
        user_id: i64,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        self.rag.search(&self.db, user_id, query, top_k).await
    }

    /// Answer a question grounded in the user's documents
    pub async fn ask(
        &self,
        user_id: i64,
        query: &str,
        model: Option<&str>,
        top_k: Option<usize>,
    ) -> Result<RagAnswer> {
        let model = model.unwrap_or(&self.config.inference.model);
        self.rag
            .generate_with_context(
                &self.db,
                &self.dispatcher,
                user_id,
                query,
                model,
                &self.config.retry.fallback_models,
                top_k,
            )
            .await
    }

    pub async fn delete_document(&self, user_id: i64, document_id: i64) -> Result<()> {
        self.rag.delete_document(&self.db, user_id, document_id).await
    }

    pub fn list_documents(&self, user_id: i64) -> Result<Vec<DocumentSummary>> {
        self.db.list_documents(user_id)
    }

    pub fn rag_stats(&self) -> Result<RagStats> {
        self.db.rag_stats()
    }

    // --- comparison ---

    #[allow(clippy::too_many_arguments)]
    pub async fn compare(
        &self,
        user_id: i64,
        models: &[String],
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: f64,
        max_tokens: Option<u32>,
    ) -> Result<ComparisonRecord> {
        compare::compare_models(
            &self.db,
            &self.dispatcher,
            user_id,
            models,
            prompt,
            system_prompt,
            temperature,
            max_tokens,
        )
        .await
    }

    pub fn delete_comparison(&self, user_id: i64, comparison_id: i64) -> Result<()> {
        compare::delete_comparison(&self.db, user_id, comparison_id)
    }

    pub fn rate_response(&self, user_id: i64, response_id: i64, rating: i32) -> Result<()> {
        compare::rate_response(&self.db, user_id, response_id, rating)
    }

    pub fn get_comparison(&self, comparison_id: i64, user_id: i64) -> Result<Option<ComparisonRecord>> {
        self.db.get_comparison(comparison_id, user_id)
    }

    pub fn list_comparisons(&self, user_id: i64, limit: usize) -> Result<Vec<ComparisonRecord>> {
        self.db.list_comparisons(user_id, limit)
    }

    pub fn model_rankings(&self, user_id: Option<i64>, days: i64) -> Result<Vec<ModelRanking>> {
        compare::rankings(&self.db, user_id, days)
    }

    pub fn comparison_statistics(&self, user_id: Option<i64>) -> Result<ComparisonStats> {
        compare::statistics(&self.db, user_id)
    }

    // --- maintenance ---

    pub fn cache_stats(&self) -> Result<CacheStats> {
        self.db.cache_stats()
    }

    /// Drop expired cache entries; returns how many were removed
    pub fn cache_sweep(&self) -> Result<usize> {
        self.db.cache_clear_expired()
    }

    /// Invalidate cache entries whose prompt matches the pattern, or all
    /// entries when no pattern is given
    pub fn cache_invalidate(&self, pattern: Option<&str>) -> Result<usize> {
        self.db.cache_invalidate(pattern)
    }

    pub fn retry_stats(&self) -> Result<RetryStats> {
        self.db.retry_stats()
    }

    /// Fraction of failed attempts over the trailing window, in hours
    pub fn retry_failure_rate(&self, hours: i64) -> Result<f64> {
        self.db.retry_failure_rate(hours)
    }
}
