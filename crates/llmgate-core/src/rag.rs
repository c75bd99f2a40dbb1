//! Retrieval-augmented generation
//!
//! Documents are split into fixed-size word windows, embedded at ingest
//! time, and retrieved by cosine similarity against a query embedding.
//! Ingestion and retrieval both degrade rather than fail when the
//! embedding service is down: chunks are stored without vectors and
//! retrieval falls back to keyword overlap for them.

use crate::config::RagConfig;
use crate::db::{ChunkRecord, Database, StoredChunk};
use crate::db::vectors::cosine_similarity;
use crate::dispatch::Dispatcher;
use crate::error::{LlmGateError, Result};
use crate::llm::{Embedder, GenerationRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// How a retrieved chunk matched the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    Embedding,
    Keyword,
}

/// One retrieved chunk with its relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: i64,
    pub document_id: i64,
    pub title: String,
    pub source: Option<String>,
    pub content: String,
    pub score: f32,
    pub matched_by: MatchKind,
}

/// Answer produced from retrieved context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub text: String,
    pub sources: Vec<SearchHit>,
    pub model_used: Option<String>,
    pub cached: bool,
}

/// Chunking, ingestion and retrieval over the document store
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    embedding_model: String,
    config: RagConfig,
}

impl RagEngine {
    pub fn new(embedder: Arc<dyn Embedder>, embedding_model: String, config: RagConfig) -> Self {
        Self {
            embedder,
            embedding_model,
            config,
        }
    }

    /// Ingest a document: chunk, embed each chunk, store everything in one
    /// transaction. A chunk whose embedding call fails or stalls is stored
    /// without a vector and remains reachable through keyword matching.
    pub async fn add_document(
        &self,
        db: &Database,
        user_id: i64,
        title: &str,
        content: &str,
        source: Option<&str>,
        metadata: Option<&str>,
    ) -> Result<i64> {
        if content.trim().is_empty() {
            return Err(LlmGateError::Validation(
                "document content is empty".to_string(),
            ));
        }

        let pieces = chunk_by_words(content, self.config.chunk_size_words);
        let mut chunks = Vec::with_capacity(pieces.len());
        let mut unembedded = 0usize;

        for piece in pieces {
            let embedding = match tokio::time::timeout(
                Duration::from_secs(self.config.embed_timeout_secs),
                self.embedder.embed(&self.embedding_model, &piece),
            )
            .await
            {
                Ok(Ok(vector)) => Some(vector),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "chunk embedding failed, storing without vector");
                    unembedded += 1;
                    None
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = self.config.embed_timeout_secs,
                        "chunk embedding timed out, storing without vector"
                    );
                    unembedded += 1;
                    None
                }
            };

            chunks.push(StoredChunk {
                token_count: piece.split_whitespace().count(),
                content: piece,
                embedding,
            });
        }

        let doc_id = db.insert_document(user_id, title, content, source, metadata, &chunks)?;
        tracing::info!(
            doc_id,
            chunks = chunks.len(),
            unembedded,
            "document ingested"
        );
        Ok(doc_id)
    }

    /// Retrieve the user's most relevant chunks for a query.
    ///
    /// Embedded chunks are scored by cosine similarity; chunks stored
    /// without vectors are scored by keyword overlap so they still
    /// participate. When the query itself cannot be embedded, everything
    /// falls back to keyword scoring.
    pub async fn search(
        &self,
        db: &Database,
        user_id: i64,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        let top_k = top_k.unwrap_or(self.config.default_top_k);
        let chunks = db.chunks_for_user(user_id)?;
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = match self.embedder.embed(&self.embedding_model, query).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                tracing::warn!(error = %e, "query embedding unavailable, keyword search only");
                None
            }
        };

        let query_terms = keyword_terms(query);
        let mut hits: Vec<SearchHit> = chunks
            .into_iter()
            .filter_map(|chunk| score_chunk(chunk, query_embedding.as_deref(), &query_terms))
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    /// Answer a question from retrieved context.
    ///
    /// Retrieval happens first; the assembled context and question go
    /// through the dispatcher with the caller's fallback chain, so the
    /// answer gets the same caching, retries and model fallback as a
    /// plain generation.
    #[allow(clippy::too_many_arguments)]
    pub async fn generate_with_context(
        &self,
        db: &Database,
        dispatcher: &Dispatcher,
        user_id: i64,
        query: &str,
        model: &str,
        fallback_chain: &[String],
        top_k: Option<usize>,
    ) -> Result<RagAnswer> {
        let sources = self.search(db, user_id, query, top_k).await?;

        if sources.is_empty() {
            return Ok(RagAnswer {
                text: "No relevant documents found. Add documents before asking questions."
                    .to_string(),
                sources,
                model_used: None,
                cached: false,
            });
        }

        let context = sources
            .iter()
            .enumerate()
            .map(|(i, hit)| format!("Source {} ({}):\n{}", i + 1, hit.title, hit.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Answer the question based on the following context.\n\n\
             Context:\n{context}\n\nQuestion: {query}\n\nAnswer:"
        );

        let request = GenerationRequest::new(model, prompt);
        let outcome = dispatcher.dispatch(db, &request, fallback_chain, None).await?;

        Ok(RagAnswer {
            text: outcome.text,
            sources,
            model_used: Some(outcome.model_used),
            cached: outcome.cached,
        })
    }

    /// Delete a document the user owns; chunks cascade
    pub async fn delete_document(&self, db: &Database, user_id: i64, document_id: i64) -> Result<()> {
        match db.document_owner(document_id)? {
            None => Err(LlmGateError::DocumentNotFound(document_id)),
            Some(owner) if owner != user_id => Err(LlmGateError::Permission(format!(
                "document {document_id} belongs to another user"
            ))),
            Some(_) => {
                db.delete_document_row(document_id)?;
                tracing::info!(document_id, "document deleted");
                Ok(())
            }
        }
    }
}

/// Split text into consecutive windows of at most `chunk_size` words.
/// Text at or under the window size comes back as a single chunk.
pub fn chunk_by_words(text: &str, chunk_size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    words
        .chunks(chunk_size.max(1))
        .map(|window| window.join(" "))
        .collect()
}

fn keyword_terms(query: &str) -> HashSet<String> {
    query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Share of query terms present in the content
fn keyword_score(content: &str, query_terms: &HashSet<String>) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let content_terms = keyword_terms(content);
    let matched = query_terms
        .iter()
        .filter(|term| content_terms.contains(*term))
        .count();
    matched as f32 / query_terms.len() as f32
}

fn score_chunk(
    chunk: ChunkRecord,
    query_embedding: Option<&[f32]>,
    query_terms: &HashSet<String>,
) -> Option<SearchHit> {
    let (score, matched_by) = match (query_embedding, chunk.embedding.as_deref()) {
        (Some(query), Some(embedding)) => {
            (cosine_similarity(query, embedding), MatchKind::Embedding)
        }
        _ => (keyword_score(&chunk.content, query_terms), MatchKind::Keyword),
    };

    if score <= 0.0 {
        return None;
    }

    Some(SearchHit {
        chunk_id: chunk.chunk_id,
        document_id: chunk.document_id,
        title: chunk.title,
        source: chunk.source,
        content: chunk.content,
        score,
        matched_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, RetryConfig};
    use crate::cost::PricingTable;
    use crate::llm::{Generation, TextGenerator};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic bag-of-words embedder: each word bumps one dimension,
    /// so shared vocabulary yields high cosine similarity.
    struct BagOfWordsEmbedder;

    #[async_trait]
    impl Embedder for BagOfWordsEmbedder {
        async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>> {
            let mut vector = vec![0.0f32; 32];
            for term in keyword_terms(text) {
                let dim = term.bytes().map(|b| b as usize).sum::<usize>() % 32;
                vector[dim] += 1.0;
            }
            Ok(vector)
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>> {
            Err(LlmGateError::EmbeddingUnavailable(
                "connection refused".to_string(),
            ))
        }
    }

    struct CountingGenerator {
        calls: AtomicUsize,
        failing_models: Vec<String>,
    }

    impl CountingGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing_models: Vec::new(),
            }
        }

        fn failing(models: &[&str]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing_models: models.iter().map(|m| m.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_models.contains(&request.model) {
                return Err(LlmGateError::Inference {
                    model: request.model.clone(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(Generation {
                text: format!("answered via {}", request.model),
                prompt_tokens: 10,
                response_tokens: 5,
                duration_ms: 1,
            })
        }
    }

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn engine(embedder: Arc<dyn Embedder>) -> RagEngine {
        RagEngine::new(embedder, "embed-model".to_string(), RagConfig::default())
    }

    fn dispatcher(generator: Arc<dyn TextGenerator>) -> Dispatcher {
        Dispatcher::new(
            generator,
            RetryConfig {
                max_retries_per_model: 1,
                fallback_models: vec![],
                base_delay_ms: 1,
                max_delay_ms: 1,
            },
            CacheConfig::default(),
            PricingTable::default(),
        )
    }

    #[test]
    fn test_chunk_by_words_windows() {
        let text = (0..1200).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = chunk_by_words(&text, 500);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].split_whitespace().count(), 500);
        assert_eq!(chunks[1].split_whitespace().count(), 500);
        assert_eq!(chunks[2].split_whitespace().count(), 200);

        assert_eq!(chunk_by_words("short text only", 500), vec!["short text only"]);
        assert!(chunk_by_words("   ", 500).is_empty());
    }

    #[tokio::test]
    async fn test_add_document_rejects_empty_content() {
        let db = db();
        let engine = engine(Arc::new(BagOfWordsEmbedder));
        let err = engine
            .add_document(&db, 1, "t", "   ", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmGateError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_ranks_semantically_closer_chunk_first() {
        let db = db();
        let engine = engine(Arc::new(BagOfWordsEmbedder));

        engine
            .add_document(
                &db,
                1,
                "cooking",
                "recipes for pasta sauce and fresh bread baking",
                None,
                None,
            )
            .await
            .unwrap();
        engine
            .add_document(
                &db,
                1,
                "rust",
                "rust ownership borrowing lifetimes and the borrow checker",
                None,
                None,
            )
            .await
            .unwrap();

        let hits = engine
            .search(&db, 1, "rust borrow checker lifetimes", Some(2))
            .await
            .unwrap();

        assert!(!hits.is_empty());
        assert_eq!(hits[0].title, "rust");
        assert_eq!(hits[0].matched_by, MatchKind::Embedding);
    }

    #[tokio::test]
    async fn test_search_scoped_to_user() {
        let db = db();
        let engine = engine(Arc::new(BagOfWordsEmbedder));
        engine
            .add_document(&db, 1, "private", "secret rust notes", None, None)
            .await
            .unwrap();

        let hits = engine.search(&db, 2, "rust notes", None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_degrades_to_keyword_search_when_embedder_down() {
        let db = db();
        let down = engine(Arc::new(DownEmbedder));

        let doc_id = down
            .add_document(&db, 1, "notes", "tokio runtime scheduling internals", None, None)
            .await
            .unwrap();
        assert!(doc_id > 0);

        // Chunks were stored without vectors
        let chunks = db.chunks_for_user(1).unwrap();
        assert!(chunks.iter().all(|c| c.embedding.is_none()));

        // Retrieval still works via keyword overlap
        let hits = down
            .search(&db, 1, "tokio scheduling", None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].matched_by, MatchKind::Keyword);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_mixed_corpus_merges_embedding_and_keyword_hits() {
        let db = db();
        let healthy = engine(Arc::new(BagOfWordsEmbedder));
        let down = engine(Arc::new(DownEmbedder));

        healthy
            .add_document(&db, 1, "embedded", "async await executors in rust", None, None)
            .await
            .unwrap();
        down.add_document(&db, 1, "plain", "rust async task wakers", None, None)
            .await
            .unwrap();

        let hits = healthy.search(&db, 1, "rust async", Some(5)).await.unwrap();
        assert_eq!(hits.len(), 2);
        let kinds: HashSet<_> = hits.iter().map(|h| h.matched_by).collect();
        assert!(kinds.contains(&MatchKind::Embedding));
        assert!(kinds.contains(&MatchKind::Keyword));
    }

    #[tokio::test]
    async fn test_generate_with_context_empty_corpus_skips_dispatch() {
        let db = db();
        let engine = engine(Arc::new(BagOfWordsEmbedder));
        let generator = Arc::new(CountingGenerator::new());
        let dispatcher = dispatcher(generator.clone());

        let answer = engine
            .generate_with_context(&db, &dispatcher, 1, "anything?", "m1", &[], None)
            .await
            .unwrap();

        assert!(answer.sources.is_empty());
        assert!(answer.model_used.is_none());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generate_with_context_builds_sourced_prompt() {
        let db = db();
        let engine = engine(Arc::new(BagOfWordsEmbedder));
        let generator = Arc::new(CountingGenerator::new());
        let dispatcher = dispatcher(generator.clone());

        engine
            .add_document(&db, 1, "guide", "rust error handling with thiserror", None, None)
            .await
            .unwrap();

        let answer = engine
            .generate_with_context(&db, &dispatcher, 1, "rust error handling", "m1", &[], None)
            .await
            .unwrap();

        assert_eq!(answer.text, "answered via m1");
        assert_eq!(answer.model_used.as_deref(), Some("m1"));
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].title, "guide");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_grounded_answer_uses_fallback_chain() {
        let db = db();
        let engine = engine(Arc::new(BagOfWordsEmbedder));
        let generator = Arc::new(CountingGenerator::failing(&["m1"]));
        let dispatcher = dispatcher(generator.clone());

        engine
            .add_document(&db, 1, "guide", "rust error handling with thiserror", None, None)
            .await
            .unwrap();

        let chain = vec!["m2".to_string()];
        let answer = engine
            .generate_with_context(&db, &dispatcher, 1, "rust error handling", "m1", &chain, None)
            .await
            .unwrap();

        assert_eq!(answer.text, "answered via m2");
        assert_eq!(answer.model_used.as_deref(), Some("m2"));
        assert!(!answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_search_truncates_to_top_k_sorted() {
        let db = db();
        let engine = engine(Arc::new(BagOfWordsEmbedder));

        for (title, content) in [
            ("a", "rust borrow checker rules"),
            ("b", "rust borrow semantics"),
            ("c", "rust syntax overview"),
            ("d", "gardening in spring"),
        ] {
            engine
                .add_document(&db, 1, title, content, None, None)
                .await
                .unwrap();
        }

        let hits = engine
            .search(&db, 1, "rust borrow checker", Some(2))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].title, "a");
    }

    #[tokio::test]
    async fn test_delete_document_enforces_ownership() {
        let db = db();
        let engine = engine(Arc::new(BagOfWordsEmbedder));
        let doc_id = engine
            .add_document(&db, 1, "mine", "some words", None, None)
            .await
            .unwrap();

        let err = engine.delete_document(&db, 2, doc_id).await.unwrap_err();
        assert!(matches!(err, LlmGateError::Permission(_)));

        engine.delete_document(&db, 1, doc_id).await.unwrap();
        let err = engine.delete_document(&db, 1, doc_id).await.unwrap_err();
        assert!(matches!(err, LlmGateError::DocumentNotFound(_)));
    }
}
