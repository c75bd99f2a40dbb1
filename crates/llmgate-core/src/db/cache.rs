//! Response cache operations
//!
//! Entries are keyed by the request fingerprint and upserted atomically,
//! so concurrent identical requests can at worst duplicate work, never
//! corrupt an entry. A read racing the expiry sweep sees either the entry
//! or a miss.

use super::schema::now_rfc3339;
use super::Database;
use crate::error::Result;
use crate::llm::GenerationRequest;
use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: u64,
    pub total_hits: u64,
    pub avg_hits: f64,
    pub expired_entries: u64,
}

impl Database {
    /// Look up a cached response.
    ///
    /// Returns `None` when no entry exists or the entry has expired. A hit
    /// bumps the hit count and last-accessed time.
    pub fn cache_get(&self, cache_key: &str) -> Result<Option<String>> {
        let now = now_rfc3339();
        let response: Option<String> = self
            .conn
            .query_row(
                "SELECT response FROM llm_cache
                 WHERE cache_key = ?1
                   AND (expires_at IS NULL OR expires_at > ?2)",
                params![cache_key, now],
                |row| row.get(0),
            )
            .optional()?;

        if response.is_some() {
            self.conn.execute(
                "UPDATE llm_cache
                 SET hit_count = hit_count + 1, last_accessed = ?1
                 WHERE cache_key = ?2",
                params![now, cache_key],
            )?;
        }

        Ok(response)
    }

    /// Store a response under the request fingerprint.
    ///
    /// `ttl_secs = None` means the entry never expires. The upsert is a
    /// single statement keyed by fingerprint.
    pub fn cache_put(
        &self,
        cache_key: &str,
        request: &GenerationRequest,
        response: &str,
        ttl_secs: Option<i64>,
    ) -> Result<()> {
        let now = now_rfc3339();
        let expires_at = ttl_secs.map(|ttl| (Utc::now() + Duration::seconds(ttl)).to_rfc3339());

        self.conn.execute(
            "INSERT OR REPLACE INTO llm_cache
             (cache_key, model, prompt, system_prompt, response,
              temperature, max_tokens, hit_count, created_at, last_accessed, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8, ?9)",
            params![
                cache_key,
                request.model,
                request.prompt,
                request.system,
                response,
                request.temperature,
                request.max_tokens,
                now,
                expires_at,
            ],
        )?;

        Ok(())
    }

    /// Remove entries whose expiry has passed; returns the number removed.
    /// Entries with a NULL expiry are never swept.
    pub fn cache_clear_expired(&self) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM llm_cache
             WHERE expires_at IS NOT NULL AND expires_at < ?1",
            params![now_rfc3339()],
        )?;
        Ok(deleted)
    }

    /// Invalidate entries whose prompt contains `pattern`, or every entry
    /// when no pattern is given. Returns the number removed.
    pub fn cache_invalidate(&self, pattern: Option<&str>) -> Result<usize> {
        let deleted = match pattern {
            Some(p) => self.conn.execute(
                "DELETE FROM llm_cache WHERE prompt LIKE ?1",
                params![format!("%{}%", p)],
            )?,
            None => self.conn.execute("DELETE FROM llm_cache", [])?,
        };
        Ok(deleted)
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> Result<CacheStats> {
        self.conn
            .query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(hit_count), 0),
                    COALESCE(AVG(hit_count), 0.0),
                    COUNT(CASE WHEN expires_at < ?1 THEN 1 END)
                 FROM llm_cache",
                params![now_rfc3339()],
                |row| {
                    Ok(CacheStats {
                        total_entries: row.get::<_, i64>(0)? as u64,
                        total_hits: row.get::<_, i64>(1)? as u64,
                        avg_hits: row.get(2)?,
                        expired_entries: row.get::<_, i64>(3)? as u64,
                    })
                },
            )
            .map_err(Into::into)
    }

    /// Hit count for one entry (used by diagnostics and tests)
    pub fn cache_hit_count(&self, cache_key: &str) -> Result<Option<u64>> {
        let count: Option<i64> = self
            .conn
            .query_row(
                "SELECT hit_count FROM llm_cache WHERE cache_key = ?1",
                params![cache_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.map(|c| c as u64))
    }
}
