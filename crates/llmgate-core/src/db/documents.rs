//! Document and chunk storage for retrieval
//!
//! A document and its chunks are inserted in one transaction; deleting a
//! document cascades to its chunks. Chunks are immutable once written;
//! re-ingesting content creates a new document rather than mutating rows.

use super::schema::now_rfc3339;
use super::vectors::{bytes_to_embedding, embedding_to_bytes};
use super::Database;
use crate::error::Result;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Chunk ready for insertion
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub content: String,
    /// None when the embedding service was unavailable at ingest time
    pub embedding: Option<Vec<f32>>,
    pub token_count: usize,
}

/// Chunk joined with its parent document, as loaded for retrieval
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk_id: i64,
    pub document_id: i64,
    pub title: String,
    pub source: Option<String>,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

/// Per-document listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub title: String,
    pub source: Option<String>,
    pub created_at: String,
    pub chunk_count: u64,
}

/// Corpus-wide ingestion statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagStats {
    pub total_documents: u64,
    pub total_chunks: u64,
    pub total_tokens: u64,
    pub embedded_chunks: u64,
}

impl Database {
    /// Insert a document together with its chunks; returns the document id
    pub fn insert_document(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        source: Option<&str>,
        metadata: Option<&str>,
        chunks: &[StoredChunk],
    ) -> Result<i64> {
        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| {
            self.conn.execute(
                "INSERT INTO documents (user_id, title, content, source, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![user_id, title, content, source, metadata, now_rfc3339()],
            )?;
            let doc_id = self.conn.last_insert_rowid();

            for (index, chunk) in chunks.iter().enumerate() {
                let embedding_bytes = chunk.embedding.as_deref().map(embedding_to_bytes);
                self.conn.execute(
                    "INSERT INTO document_chunks
                     (document_id, chunk_index, content, embedding, token_count)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        doc_id,
                        index as i64,
                        chunk.content,
                        embedding_bytes,
                        chunk.token_count as i64,
                    ],
                )?;
            }

            Ok(doc_id)
        })();

        if result.is_ok() {
            self.conn.execute("COMMIT", [])?;
        } else {
            let _ = self.conn.execute("ROLLBACK", []);
        }
        result
    }

    /// All chunks owned by a user, with parent document title and source
    pub fn chunks_for_user(&self, user_id: i64) -> Result<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT dc.id, dc.document_id, d.title, d.source, dc.content, dc.embedding
             FROM document_chunks dc
             JOIN documents d ON dc.document_id = d.id
             WHERE d.user_id = ?1
             ORDER BY dc.document_id, dc.chunk_index",
        )?;

        let chunks = stmt
            .query_map(params![user_id], |row| {
                let embedding_bytes: Option<Vec<u8>> = row.get(5)?;
                Ok(ChunkRecord {
                    chunk_id: row.get(0)?,
                    document_id: row.get(1)?,
                    title: row.get(2)?,
                    source: row.get(3)?,
                    content: row.get(4)?,
                    embedding: embedding_bytes.as_deref().map(bytes_to_embedding),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(chunks)
    }

    /// Owner of a document, or None when it does not exist
    pub fn document_owner(&self, document_id: i64) -> Result<Option<i64>> {
        let owner = self
            .conn
            .query_row(
                "SELECT user_id FROM documents WHERE id = ?1",
                params![document_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    /// Delete a document; chunks cascade via the foreign key
    pub fn delete_document_row(&self, document_id: i64) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM documents WHERE id = ?1",
            params![document_id],
        )?;
        Ok(deleted > 0)
    }

    /// List a user's documents newest-first with chunk counts
    pub fn list_documents(&self, user_id: i64) -> Result<Vec<DocumentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.title, d.source, d.created_at, COUNT(dc.id)
             FROM documents d
             LEFT JOIN document_chunks dc ON d.id = dc.document_id
             WHERE d.user_id = ?1
             GROUP BY d.id
             ORDER BY d.created_at DESC",
        )?;

        let docs = stmt
            .query_map(params![user_id], |row| {
                Ok(DocumentSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    source: row.get(2)?,
                    created_at: row.get(3)?,
                    chunk_count: row.get::<_, i64>(4)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(docs)
    }

    /// Corpus-wide ingestion statistics
    pub fn rag_stats(&self) -> Result<RagStats> {
        self.conn
            .query_row(
                "SELECT
                    COUNT(DISTINCT d.id),
                    COUNT(dc.id),
                    COALESCE(SUM(dc.token_count), 0),
                    COUNT(CASE WHEN dc.embedding IS NOT NULL THEN 1 END)
                 FROM documents d
                 LEFT JOIN document_chunks dc ON d.id = dc.document_id",
                [],
                |row| {
                    Ok(RagStats {
                        total_documents: row.get::<_, i64>(0)? as u64,
                        total_chunks: row.get::<_, i64>(1)? as u64,
                        total_tokens: row.get::<_, i64>(2)? as u64,
                        embedded_chunks: row.get::<_, i64>(3)? as u64,
                    })
                },
            )
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn chunk(content: &str, embedding: Option<Vec<f32>>) -> StoredChunk {
        StoredChunk {
            content: content.to_string(),
            embedding,
            token_count: content.split_whitespace().count(),
        }
    }

    #[test]
    fn test_insert_and_load_chunks() {
        let db = db();
        let doc_id = db
            .insert_document(
                1,
                "notes",
                "alpha beta gamma",
                Some("upload"),
                None,
                &[
                    chunk("alpha beta", Some(vec![1.0, 0.0])),
                    chunk("gamma", None),
                ],
            )
            .unwrap();

        let chunks = db.chunks_for_user(1).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].document_id, doc_id);
        assert_eq!(chunks[0].title, "notes");
        assert_eq!(chunks[0].embedding, Some(vec![1.0, 0.0]));
        assert!(chunks[1].embedding.is_none());

        // Scoped to the owner
        assert!(db.chunks_for_user(2).unwrap().is_empty());
    }

    #[test]
    fn test_delete_cascades_to_chunks() {
        let db = db();
        let doc_id = db
            .insert_document(1, "t", "c", None, None, &[chunk("c", None)])
            .unwrap();

        assert!(db.delete_document_row(doc_id).unwrap());
        assert!(db.chunks_for_user(1).unwrap().is_empty());
        assert_eq!(db.rag_stats().unwrap().total_chunks, 0);
    }

    #[test]
    fn test_list_documents_with_counts() {
        let db = db();
        db.insert_document(1, "a", "x y", None, None, &[chunk("x", None), chunk("y", None)])
            .unwrap();
        db.insert_document(1, "b", "z", Some("web"), None, &[chunk("z", None)])
            .unwrap();

        let docs = db.list_documents(1).unwrap();
        assert_eq!(docs.len(), 2);
        let by_title: Vec<_> = docs.iter().map(|d| (d.title.as_str(), d.chunk_count)).collect();
        assert!(by_title.contains(&("a", 2)));
        assert!(by_title.contains(&("b", 1)));
    }

    #[test]
    fn test_rag_stats() {
        let db = db();
        db.insert_document(
            1,
            "t",
            "one two three",
            None,
            None,
            &[chunk("one two", Some(vec![0.5, 0.5])), chunk("three", None)],
        )
        .unwrap();

        let stats = db.rag_stats().unwrap();
        assert_eq!(stats.total_documents, 1);
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.total_tokens, 3);
        assert_eq!(stats.embedded_chunks, 1);
    }
}
