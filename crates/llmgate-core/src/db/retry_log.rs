//! Retry attempt log
//!
//! Append-only: the core never mutates or deletes rows. Retention is an
//! operational concern outside this layer.

use super::schema::now_rfc3339;
use super::Database;
use crate::error::Result;
use chrono::{Duration, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// One logged attempt as read back from the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryLogRow {
    pub request_id: String,
    pub model: String,
    pub attempt: u32,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub created_at: String,
}

/// Aggregate retry statistics over the trailing 24 hours
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryStats {
    pub total_requests: u64,
    pub successful_attempts: u64,
    pub failed_attempts: u64,
    pub avg_duration_ms: f64,
    pub retried_attempts: u64,
}

impl Database {
    /// Append one dispatch attempt to the log
    pub fn log_retry_attempt(
        &self,
        request_id: &str,
        model: &str,
        attempt: u32,
        success: bool,
        error: Option<&str>,
        duration_ms: u64,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO retry_log
             (request_id, model, attempt, success, error, duration_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                request_id,
                model,
                attempt,
                success,
                error,
                duration_ms as i64,
                now_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All attempts recorded for one dispatch, in log order
    pub fn attempts_for_request(&self, request_id: &str) -> Result<Vec<RetryLogRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT request_id, model, attempt, success, error, duration_ms, created_at
             FROM retry_log WHERE request_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![request_id], |row| {
                Ok(RetryLogRow {
                    request_id: row.get(0)?,
                    model: row.get(1)?,
                    attempt: row.get(2)?,
                    success: row.get(3)?,
                    error: row.get(4)?,
                    duration_ms: row.get::<_, i64>(5)? as u64,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Failure rate (failures / total attempts) over the trailing window.
    /// Returns 0.0 when there are no attempts.
    pub fn retry_failure_rate(&self, hours: i64) -> Result<f64> {
        let cutoff = (Utc::now() - Duration::hours(hours)).to_rfc3339();
        let (total, failures): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END), 0)
             FROM retry_log WHERE created_at >= ?1",
            params![cutoff],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        if total > 0 {
            Ok(failures as f64 / total as f64)
        } else {
            Ok(0.0)
        }
    }

    /// Aggregate statistics over the trailing 24 hours
    pub fn retry_stats(&self) -> Result<RetryStats> {
        let cutoff = (Utc::now() - Duration::hours(24)).to_rfc3339();
        self.conn
            .query_row(
                "SELECT
                    COUNT(DISTINCT request_id),
                    COALESCE(SUM(CASE WHEN success = 1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END), 0),
                    COALESCE(AVG(duration_ms), 0.0),
                    COUNT(CASE WHEN attempt > 1 THEN 1 END)
                 FROM retry_log WHERE created_at >= ?1",
                params![cutoff],
                |row| {
                    Ok(RetryStats {
                        total_requests: row.get::<_, i64>(0)? as u64,
                        successful_attempts: row.get::<_, i64>(1)? as u64,
                        failed_attempts: row.get::<_, i64>(2)? as u64,
                        avg_duration_ms: row.get(3)?,
                        retried_attempts: row.get::<_, i64>(4)? as u64,
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

    #[test]
    fn test_log_and_read_back() {
        let db = db();
        db.log_retry_attempt("req-1", "m1", 1, false, Some("boom"), 12)
            .unwrap();
        db.log_retry_attempt("req-1", "m1", 2, true, None, 30).unwrap();
        db.log_retry_attempt("req-2", "m2", 1, true, None, 5).unwrap();

        let rows = db.attempts_for_request("req-1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].attempt, 1);
        assert!(!rows[0].success);
        assert_eq!(rows[0].error.as_deref(), Some("boom"));
        assert!(rows[1].success);
    }

    #[test]
    fn test_failure_rate() {
        let db = db();
        assert_eq!(db.retry_failure_rate(24).unwrap(), 0.0);

        db.log_retry_attempt("r", "m", 1, false, Some("e"), 1).unwrap();
        db.log_retry_attempt("r", "m", 2, false, Some("e"), 1).unwrap();
        db.log_retry_attempt("r", "m", 3, true, None, 1).unwrap();

        let rate = db.retry_failure_rate(24).unwrap();
        assert!((rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats() {
        let db = db();
        db.log_retry_attempt("a", "m1", 1, false, Some("e"), 10).unwrap();
        db.log_retry_attempt("a", "m1", 2, true, None, 20).unwrap();
        db.log_retry_attempt("b", "m2", 1, true, None, 30).unwrap();

        let stats = db.retry_stats().unwrap();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.successful_attempts, 2);
        assert_eq!(stats.failed_attempts, 1);
        assert_eq!(stats.retried_attempts, 1);
        assert!((stats.avg_duration_ms - 20.0).abs() < 1e-9);
    }
}
