//! Per-user memory: storage, forgetting, decay, and relevance ranking.
//!
//! The free functions in the submodules take a [`rusqlite::Connection`] and an
//! explicit `now`, which keeps them deterministic under test. [`MemoryStore`]
//! wraps them for the conversation loop: it opens a fresh connection for every
//! call and turns storage failures into logged sentinel outcomes, so a broken
//! database costs a memory, never a turn.

pub mod forget;
pub mod maintenance;
pub mod policy;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::MemoryConfig;
use crate::db;
use forget::ForgetOutcome;
use maintenance::DecayResult;
use search::RankedMemory;
use store::{CapacityLimits, NewMemory};
use types::MemoryType;

/// Canonical timestamp text: RFC 3339, UTC, millisecond precision, `Z` suffix.
///
/// Fixed width, so lexical order equals chronological order, and readable by
/// SQLite's date functions.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp. Returns `None` for anything that isn't RFC 3339.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Hard errors from the store facade. Everything else is a sentinel outcome.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Caller passed an empty user identity.
    #[error("user name is required")]
    MissingUser,
    /// The database could not be opened or initialized.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Outcome of a best-effort write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteOutcome {
    Stored { id: i64, evicted: usize },
    /// The write policy declined the turn.
    Skipped,
    /// The store failed. Already logged.
    Failed,
}

/// Durable per-user memory backed by a SQLite file.
///
/// Holds a path, not a handle: every operation opens its own connection and
/// transaction and drops both before returning.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    db_path: PathBuf,
    limits: CapacityLimits,
    default_decay_rate: f64,
}

impl MemoryStore {
    /// Create (or upgrade) the database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>, config: &MemoryConfig) -> Result<Self, MemoryError> {
        let db_path = db_path.as_ref().to_path_buf();
        db::open_database(&db_path)?;
        Ok(Self {
            db_path,
            limits: CapacityLimits::from(config),
            default_decay_rate: config.default_decay_rate,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> anyhow::Result<Connection> {
        db::connect(&self.db_path)
    }

    /// Write a memory for `user`, then evict down to capacity.
    pub fn insert(
        &self,
        user: &str,
        subject: &str,
        value: &str,
        emotional_score: f64,
        memory_type: MemoryType,
    ) -> Result<WriteOutcome, MemoryError> {
        require_user(user)?;
        let memory = NewMemory {
            user_name: user,
            subject,
            value,
            emotional_score,
            decay_rate: self.default_decay_rate,
            memory_type,
        };

        let result = self
            .connect()
            .and_then(|mut conn| store::store_memory(&mut conn, &memory, self.limits, Utc::now()));
        Ok(match result {
            Ok(stored) => WriteOutcome::Stored {
                id: stored.id,
                evicted: stored.evicted,
            },
            Err(e) => {
                tracing::warn!(user = %user, error = %format!("{e:#}"), "memory write failed");
                WriteOutcome::Failed
            }
        })
    }

    /// Apply the write policy to a finished turn and store it if it qualifies.
    ///
    /// The prompt becomes the subject (truncated), the reply the value.
    pub fn persist_turn(
        &self,
        user: &str,
        prompt: &str,
        reply: &str,
        emotional_score: f64,
    ) -> Result<WriteOutcome, MemoryError> {
        require_user(user)?;
        match policy::classify_turn(prompt) {
            Some(memory_type) => self.insert(user, prompt, reply, emotional_score, memory_type),
            None => Ok(WriteOutcome::Skipped),
        }
    }

    /// Delete every memory of `user` mentioning `keyword`.
    pub fn delete_by_keyword(&self, user: &str, keyword: &str) -> Result<ForgetOutcome, MemoryError> {
        require_user(user)?;
        let result = self
            .connect()
            .and_then(|mut conn| forget::forget_by_keyword(&mut conn, user, keyword));
        Ok(result.unwrap_or_else(|e| {
            tracing::warn!(user = %user, error = %format!("{e:#}"), "forget failed");
            ForgetOutcome::Failed
        }))
    }

    /// Run one global decay sweep. Returns `None` if it failed; the failure is
    /// logged and no score is changed.
    pub fn apply_decay(&self) -> Option<DecayResult> {
        let result = self
            .connect()
            .and_then(|mut conn| maintenance::apply_decay(&mut conn, Utc::now()));
        match result {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "decay pass failed");
                None
            }
        }
    }

    /// Top `n` memories for `user`. Storage failure yields an empty list.
    pub fn top_n(&self, user: &str, n: usize) -> Result<Vec<RankedMemory>, MemoryError> {
        require_user(user)?;
        let result = self
            .connect()
            .and_then(|conn| search::relevant_memories(&conn, user, n, Utc::now()));
        Ok(result.unwrap_or_else(|e| {
            tracing::warn!(user = %user, error = %format!("{e:#}"), "memory retrieval failed");
            Vec::new()
        }))
    }

    /// The user of a previous session, if any.
    pub fn existing_user(&self) -> Option<String> {
        let result = self.connect().and_then(|conn| search::existing_user(&conn));
        result.unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{e:#}"), "failed to look up existing user");
            None
        })
    }
}

fn require_user(user: &str) -> Result<(), MemoryError> {
    if user.trim().is_empty() {
        Err(MemoryError::MissingUser)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_format_is_fixed_width_utc() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(ts), "2026-01-02T03:04:05.000Z");
        assert_eq!(parse_timestamp("2026-01-02T03:04:05.000Z"), Some(ts));
        assert_eq!(parse_timestamp("not a time"), None);
    }

    #[test]
    fn timestamps_sort_chronologically() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::milliseconds(1);
        assert!(format_timestamp(a) < format_timestamp(b));
    }

    #[test]
    fn sqlite_default_timestamp_parses() {
        let conn = db::open_memory_database().unwrap();
        let now: String = conn
            .query_row("SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now')", [], |row| row.get(0))
            .unwrap();
        assert!(parse_timestamp(&now).is_some());
    }
}
