//! Comparison and rating storage
//!
//! Every requested model gets a response row, failed calls included, so
//! rankings can account for reliability as well as quality.

use super::schema::now_rfc3339;
use super::Database;
use crate::error::Result;
use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// One comparison with its per-model responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub id: i64,
    pub user_id: i64,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub created_at: String,
    pub responses: Vec<ComparisonResponseRecord>,
}

/// One model's outcome within a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResponseRecord {
    pub id: i64,
    pub model: String,
    pub response: Option<String>,
    pub duration_ms: u64,
    pub token_count: u64,
    pub error: Option<String>,
    pub user_rating: Option<i32>,
    pub created_at: String,
}

impl ComparisonResponseRecord {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-model aggregate over a trailing window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRanking {
    pub model: String,
    pub total_responses: u64,
    pub avg_duration_ms: f64,
    pub avg_tokens: f64,
    pub positive_ratings: u64,
    pub negative_ratings: u64,
    pub total_ratings: u64,
    /// None when no responses have been rated
    pub satisfaction_rate: Option<f64>,
    pub success_rate: f64,
}

/// Most-compared model with its frequency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCount {
    pub model: String,
    pub count: u64,
}

/// Comparison usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonStats {
    pub total_comparisons: u64,
    pub unique_models_compared: u64,
    pub most_compared_models: Vec<ModelCount>,
}

impl Database {
    /// Create a comparison record; returns its id
    pub fn insert_comparison(
        &self,
        user_id: i64,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: f64,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO comparisons (user_id, prompt, system_prompt, temperature, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, prompt, system_prompt, temperature, now_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record one model's outcome under a comparison; returns the row id
    pub fn insert_comparison_response(
        &self,
        comparison_id: i64,
        model: &str,
        response: Option<&str>,
        duration_ms: u64,
        token_count: u64,
        error: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO comparison_responses
             (comparison_id, model, response, duration_ms, token_count, error, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                comparison_id,
                model,
                response,
                duration_ms as i64,
                token_count as i64,
                error,
                now_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Load a comparison with its responses (fastest first), scoped to the
    /// owning user. Returns None for other users' comparisons.
    pub fn get_comparison(&self, comparison_id: i64, user_id: i64) -> Result<Option<ComparisonRecord>> {
        let header = self
            .conn
            .query_row(
                "SELECT id, user_id, prompt, system_prompt, temperature, created_at
                 FROM comparisons WHERE id = ?1 AND user_id = ?2",
                params![comparison_id, user_id],
                |row| {
                    Ok(ComparisonRecord {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        prompt: row.get(2)?,
                        system_prompt: row.get(3)?,
                        temperature: row.get(4)?,
                        created_at: row.get(5)?,
                        responses: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut comparison) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, model, response, duration_ms, token_count, error, user_rating, created_at
             FROM comparison_responses
             WHERE comparison_id = ?1
             ORDER BY duration_ms ASC",
        )?;

        comparison.responses = stmt
            .query_map(params![comparison_id], |row| {
                Ok(ComparisonResponseRecord {
                    id: row.get(0)?,
                    model: row.get(1)?,
                    response: row.get(2)?,
                    duration_ms: row.get::<_, i64>(3)? as u64,
                    token_count: row.get::<_, i64>(4)? as u64,
                    error: row.get(5)?,
                    user_rating: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(comparison))
    }

    /// Owner of a comparison, or None when it does not exist
    pub fn comparison_owner(&self, comparison_id: i64) -> Result<Option<i64>> {
        let owner = self
            .conn
            .query_row(
                "SELECT user_id FROM comparisons WHERE id = ?1",
                params![comparison_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    /// Owner of the comparison a response belongs to
    pub fn response_owner(&self, response_id: i64) -> Result<Option<i64>> {
        let owner = self
            .conn
            .query_row(
                "SELECT c.user_id
                 FROM comparison_responses r
                 JOIN comparisons c ON r.comparison_id = c.id
                 WHERE r.id = ?1",
                params![response_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    /// Upsert the user rating on a response (last write wins)
    pub fn set_response_rating(&self, response_id: i64, rating: i32) -> Result<()> {
        self.conn.execute(
            "UPDATE comparison_responses SET user_rating = ?1 WHERE id = ?2",
            params![rating, response_id],
        )?;
        Ok(())
    }

    /// Delete a comparison; responses cascade
    pub fn delete_comparison_row(&self, comparison_id: i64) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM comparisons WHERE id = ?1",
            params![comparison_id],
        )?;
        Ok(deleted > 0)
    }

    /// List a user's comparisons newest-first
    pub fn list_comparisons(&self, user_id: i64, limit: usize) -> Result<Vec<ComparisonRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM comparisons
             WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let ids = stmt
            .query_map(params![user_id, limit as i64], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut comparisons = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_comparison(id, user_id)? {
                comparisons.push(record);
            }
        }
        Ok(comparisons)
    }

    /// Per-model rankings over the trailing `days` window, optionally
    /// scoped to one user. Ordered by positive ratings, ties broken by
    /// speed.
    pub fn model_rankings(&self, user_id: Option<i64>, days: i64) -> Result<Vec<ModelRanking>> {
        let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();

        let sql = format!(
            "SELECT
                r.model,
                COUNT(*),
                AVG(r.duration_ms),
                AVG(r.token_count),
                SUM(CASE WHEN r.user_rating = 1 THEN 1 ELSE 0 END),
                SUM(CASE WHEN r.user_rating = -1 THEN 1 ELSE 0 END),
                SUM(CASE WHEN r.user_rating IS NOT NULL THEN 1 ELSE 0 END),
                SUM(CASE WHEN r.error IS NULL THEN 1 ELSE 0 END)
             FROM comparison_responses r
             JOIN comparisons c ON r.comparison_id = c.id
             WHERE c.created_at >= ?1 {}
             GROUP BY r.model
             ORDER BY 5 DESC, 3 ASC",
            if user_id.is_some() { "AND c.user_id = ?2" } else { "" }
        );

        let map_row = |row: &rusqlite::Row<'_>| {
            let total_responses = row.get::<_, i64>(1)? as u64;
            let positive = row.get::<_, i64>(4)? as u64;
            let negative = row.get::<_, i64>(5)? as u64;
            let total_ratings = row.get::<_, i64>(6)? as u64;
            let successful = row.get::<_, i64>(7)? as u64;

            Ok(ModelRanking {
                model: row.get(0)?,
                total_responses,
                avg_duration_ms: row.get(2)?,
                avg_tokens: row.get(3)?,
                positive_ratings: positive,
                negative_ratings: negative,
                total_ratings,
                satisfaction_rate: if total_ratings > 0 {
                    Some(positive as f64 / total_ratings as f64)
                } else {
                    None
                },
                success_rate: if total_responses > 0 {
                    successful as f64 / total_responses as f64
                } else {
                    0.0
                },
            })
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rankings = match user_id {
            Some(uid) => stmt
                .query_map(params![cutoff, uid], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(params![cutoff], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };

        Ok(rankings)
    }

    /// Usage statistics, optionally scoped to one user
    pub fn comparison_statistics(&self, user_id: Option<i64>) -> Result<ComparisonStats> {
        let total_comparisons: i64 = match user_id {
            Some(uid) => self.conn.query_row(
                "SELECT COUNT(*) FROM comparisons WHERE user_id = ?1",
                params![uid],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM comparisons", [], |row| row.get(0))?,
        };

        let unique_models: i64 = match user_id {
            Some(uid) => self.conn.query_row(
                "SELECT COUNT(DISTINCT r.model)
                 FROM comparison_responses r
                 JOIN comparisons c ON r.comparison_id = c.id
                 WHERE c.user_id = ?1",
                params![uid],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(DISTINCT model) FROM comparison_responses",
                [],
                |row| row.get(0),
            )?,
        };

        let sql = format!(
            "SELECT r.model, COUNT(*)
             FROM comparison_responses r
             JOIN comparisons c ON r.comparison_id = c.id
             {}
             GROUP BY r.model
             ORDER BY COUNT(*) DESC
             LIMIT 5",
            if user_id.is_some() { "WHERE c.user_id = ?1" } else { "" }
        );
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(ModelCount {
                model: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let most_compared = match user_id {
            Some(uid) => stmt
                .query_map(params![uid], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };

        Ok(ComparisonStats {
            total_comparisons: total_comparisons as u64,
            unique_models_compared: unique_models as u64,
            most_compared_models: most_compared,
        })
    }
}
