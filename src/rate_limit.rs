//! Sliding-window request limiter.
//!
//! Requests are recorded in a `rate_limits` table that this module owns and
//! creates on first use; the memory store never relies on it. A user may make
//! at most `max_requests` requests in any `window_secs` window.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::PathBuf;

use crate::config::RateLimitConfig;
use crate::db;

const RATE_LIMIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS rate_limits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_name TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rate_limits_user_ts ON rate_limits(user_name, timestamp);
"#;

/// Whether a request may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

/// Check-and-record in one transaction against an open connection.
pub fn check_rate(
    conn: &mut Connection,
    user_name: &str,
    config: &RateLimitConfig,
    now: DateTime<Utc>,
) -> Result<RateDecision> {
    if config.max_requests == 0 {
        return Ok(RateDecision::Allowed);
    }

    conn.execute_batch(RATE_LIMIT_SQL)?;
    let tx = conn.transaction()?;

    let now_secs = now.timestamp();
    let window_start = now_secs - config.window_secs as i64;

    tx.execute(
        "DELETE FROM rate_limits WHERE timestamp <= ?1",
        params![window_start],
    )?;

    let (count, oldest): (i64, Option<i64>) = tx.query_row(
        "SELECT COUNT(*), MIN(timestamp) FROM rate_limits WHERE user_name = ?1",
        params![user_name],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let decision = if count >= config.max_requests as i64 {
        let oldest = oldest.unwrap_or(now_secs);
        let retry_after_secs = (oldest + config.window_secs as i64 - now_secs).max(1) as u64;
        RateDecision::Limited { retry_after_secs }
    } else {
        tx.execute(
            "INSERT INTO rate_limits (user_name, timestamp) VALUES (?1, ?2)",
            params![user_name, now_secs],
        )?;
        RateDecision::Allowed
    };

    tx.commit()?;
    Ok(decision)
}

/// File-backed limiter for the conversation loop.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    db_path: PathBuf,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(db_path: impl Into<PathBuf>, config: RateLimitConfig) -> Self {
        Self {
            db_path: db_path.into(),
            config,
        }
    }

    /// Check and record a request for `user_name`. Fails open: if the table
    /// can't be reached the request is allowed and the error logged.
    pub fn check(&self, user_name: &str) -> RateDecision {
        let result = db::connect(&self.db_path)
            .and_then(|mut conn| check_rate(&mut conn, user_name, &self.config, Utc::now()));
        match result {
            Ok(decision) => {
                if let RateDecision::Limited { retry_after_secs } = decision {
                    tracing::info!(user = %user_name, retry_after_secs, "rate limited");
                }
                decision
            }
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "rate limiter unavailable, allowing request");
                RateDecision::Allowed
            }
        }
    }
}
