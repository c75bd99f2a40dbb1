//! Database schema and initialization

use crate::error::Result;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// Main database handle
pub struct Database {
    pub(crate) conn: Connection,
}

const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
-- Response cache keyed by request fingerprint
CREATE TABLE IF NOT EXISTS llm_cache (
    cache_key TEXT PRIMARY KEY,
    model TEXT NOT NULL,
    prompt TEXT NOT NULL,
    system_prompt TEXT,
    response TEXT NOT NULL,
    temperature REAL,
    max_tokens INTEGER,
    hit_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    expires_at TEXT
);

-- Append-only log of dispatch attempts (success and failure)
CREATE TABLE IF NOT EXISTS retry_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id TEXT NOT NULL,
    model TEXT NOT NULL,
    attempt INTEGER NOT NULL,
    success INTEGER NOT NULL,
    error TEXT,
    duration_ms INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Per-user document corpus for retrieval
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    source TEXT,
    metadata TEXT,
    created_at TEXT NOT NULL
);

-- Fixed-size word windows with optional embedding (NULL when the
-- embedding service was unavailable at ingest time)
CREATE TABLE IF NOT EXISTS document_chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB,
    token_count INTEGER NOT NULL
);

-- One prompt fanned out across N models
CREATE TABLE IF NOT EXISTS comparisons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    prompt TEXT NOT NULL,
    system_prompt TEXT,
    temperature REAL NOT NULL,
    created_at TEXT NOT NULL
);

-- Exactly one row per requested model, failures included
CREATE TABLE IF NOT EXISTS comparison_responses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    comparison_id INTEGER NOT NULL REFERENCES comparisons(id) ON DELETE CASCADE,
    model TEXT NOT NULL,
    response TEXT,
    duration_ms INTEGER NOT NULL,
    token_count INTEGER NOT NULL,
    error TEXT,
    user_rating INTEGER CHECK(user_rating IN (-1, 0, 1)),
    created_at TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_cache_expires ON llm_cache(expires_at);
CREATE INDEX IF NOT EXISTS idx_retry_request ON retry_log(request_id);
CREATE INDEX IF NOT EXISTS idx_retry_created ON retry_log(created_at);
CREATE INDEX IF NOT EXISTS idx_doc_user ON documents(user_id);
CREATE INDEX IF NOT EXISTS idx_chunk_doc ON document_chunks(document_id);
CREATE INDEX IF NOT EXISTS idx_comp_user ON comparisons(user_id);
CREATE INDEX IF NOT EXISTS idx_resp_comp ON comparison_responses(comparison_id);
"#;

impl Database {
    /// Open database at path, creating if necessary
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Initialize database schema
    pub fn initialize(&self) -> Result<()> {
        // Set PRAGMAs for performance and cascade semantics
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        self.conn.execute_batch(CREATE_TABLES)?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok();
        Ok(version)
    }
}

/// Current timestamp in the RFC3339 form used across every table
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
