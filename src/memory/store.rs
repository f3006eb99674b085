//! Write path: insert a record and enforce the per-user capacity bound.
//!
//! [`store_memory`] is the single entry point. Insert and eviction run inside
//! one transaction, so a failed eviction never leaves a user over the limit
//! with the new row committed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;

use crate::config::MemoryConfig;
use crate::memory::format_timestamp;
use crate::memory::types::{truncate_chars, MemoryType, SUBJECT_MAX_CHARS};

/// Per-user capacity policy.
#[derive(Debug, Clone, Copy)]
pub struct CapacityLimits {
    pub max_memories: usize,
    /// Rows deleted per eviction round. Values below 1 are treated as 1.
    pub delete_batch_size: usize,
}

impl From<&MemoryConfig> for CapacityLimits {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            max_memories: config.max_memories,
            delete_batch_size: config.delete_batch_size,
        }
    }
}

/// A record about to be written.
#[derive(Debug, Clone)]
pub struct NewMemory<'a> {
    pub user_name: &'a str,
    pub subject: &'a str,
    pub value: &'a str,
    pub emotional_score: f64,
    pub decay_rate: f64,
    pub memory_type: MemoryType,
}

/// Result returned from a store operation.
#[derive(Debug, Serialize)]
pub struct StoreMemoryResult {
    /// Row id of the new memory.
    pub id: i64,
    /// Subject as written (after truncation).
    pub subject: String,
    /// Number of records removed by capacity eviction.
    pub evicted: usize,
}

/// Full write path: insert → capacity enforcement, in one transaction.
pub fn store_memory(
    conn: &mut Connection,
    memory: &NewMemory<'_>,
    limits: CapacityLimits,
    now: DateTime<Utc>,
) -> Result<StoreMemoryResult> {
    let tx = conn.transaction()?;

    let subject = truncate_chars(memory.subject, SUBJECT_MAX_CHARS);
    let id = insert_memory(&tx, memory, subject, now)?;
    let evicted = enforce_capacity(&tx, memory.user_name, limits)?;

    tx.commit()?;

    tracing::debug!(
        id,
        user = %memory.user_name,
        memory_type = %memory.memory_type,
        evicted,
        "memory stored"
    );

    Ok(StoreMemoryResult {
        id,
        subject: subject.to_string(),
        evicted,
    })
}

/// Insert a new memory row. Returns its row id.
fn insert_memory(
    tx: &Transaction,
    memory: &NewMemory<'_>,
    subject: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let ts = format_timestamp(now);
    tx.execute(
        "INSERT INTO memories (user_name, subject, value, emotional_score, decay_rate, memory_type, created_at, last_accessed) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            memory.user_name,
            subject,
            memory.value,
            memory.emotional_score,
            memory.decay_rate,
            memory.memory_type.as_i64(),
            ts,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Delete a user's least-recently-accessed records until they are within
/// `limits.max_memories`. Returns the number of rows removed.
///
/// Deletes in rounds of `delete_batch_size`, re-counting between rounds, so an
/// overflow larger than one batch is still brought under the limit. Ties on
/// `last_accessed` are broken by ascending id.
pub fn enforce_capacity(conn: &Connection, user_name: &str, limits: CapacityLimits) -> Result<usize> {
    let batch = limits.delete_batch_size.max(1) as i64;
    let mut evicted = 0;

    loop {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM memories WHERE user_name = ?1",
            params![user_name],
            |row| row.get(0),
        )?;
        if count as usize <= limits.max_memories {
            break;
        }

        let removed = conn.execute(
            "DELETE FROM memories WHERE id IN ( \
                 SELECT id FROM memories WHERE user_name = ?1 \
                 ORDER BY last_accessed ASC, id ASC LIMIT ?2 \
             )",
            params![user_name, batch],
        )?;
        if removed == 0 {
            break;
        }
        evicted += removed;

        tracing::info!(
            user = %user_name,
            removed,
            over_by = count as usize - limits.max_memories,
            "evicted oldest memories"
        );
    }

    Ok(evicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::Duration;

    fn test_db() -> Connection {
        db::open_memory_database().unwrap()
    }

    fn feeling<'a>(user: &'a str, subject: &'a str, score: f64) -> NewMemory<'a> {
        NewMemory {
            user_name: user,
            subject,
            value: "reply",
            emotional_score: score,
            decay_rate: 0.05,
            memory_type: MemoryType::Feeling,
        }
    }

    fn unbounded() -> CapacityLimits {
        CapacityLimits {
            max_memories: usize::MAX,
            delete_batch_size: 100,
        }
    }

    fn count(conn: &Connection, user: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM memories WHERE user_name = ?1",
            params![user],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_store_new_memory() {
        let mut conn = test_db();
        let now = Utc::now();

        let result = store_memory(&mut conn, &feeling("Ada", "I feel great", 0.7), unbounded(), now).unwrap();
        assert_eq!(result.evicted, 0);

        let (subject, score, kind, created, accessed): (String, f64, i64, String, String) = conn
            .query_row(
                "SELECT subject, emotional_score, memory_type, created_at, last_accessed FROM memories WHERE id = ?1",
                params![result.id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .unwrap();
        assert_eq!(subject, "I feel great");
        assert_eq!(score, 0.7);
        assert_eq!(kind, 1);
        assert_eq!(created, accessed);
        assert_eq!(created, format_timestamp(now));
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut conn = test_db();
        let now = Utc::now();
        let a = store_memory(&mut conn, &feeling("Ada", "a", 0.1), unbounded(), now).unwrap();
        let b = store_memory(&mut conn, &feeling("Bob", "b", 0.1), unbounded(), now).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_subject_truncated_to_60_chars() {
        let mut conn = test_db();
        let long = "remember ".to_string() + &"z".repeat(100);

        let result = store_memory(&mut conn, &feeling("Ada", &long, 0.0), unbounded(), Utc::now()).unwrap();
        assert_eq!(result.subject.chars().count(), 60);

        let stored: String = conn
            .query_row("SELECT subject FROM memories WHERE id = ?1", params![result.id], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, result.subject);
    }

    #[test]
    fn test_single_batch_eviction() {
        let mut conn = test_db();
        let limits = CapacityLimits {
            max_memories: 10,
            delete_batch_size: 5,
        };
        let start = Utc::now();

        for i in 0..11 {
            store_memory(&mut conn, &feeling("Ada", &format!("m{i}"), 0.1), unbounded(), start + Duration::seconds(i)).unwrap();
        }
        assert_eq!(count(&conn, "Ada"), 11);

        let result = store_memory(&mut conn, &feeling("Ada", "m11", 0.1), limits, start + Duration::seconds(11)).unwrap();
        assert_eq!(result.evicted, 5);
        assert_eq!(count(&conn, "Ada"), 7);

        // The five oldest (m0..m4) are gone
        let oldest: String = conn
            .query_row(
                "SELECT subject FROM memories WHERE user_name = 'Ada' ORDER BY last_accessed ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(oldest, "m5");
    }

    #[test]
    fn test_overflow_larger_than_batch_loops() {
        let mut conn = test_db();
        let now = Utc::now();
        for i in 0..30 {
            store_memory(&mut conn, &feeling("Ada", &format!("m{i}"), 0.1), unbounded(), now).unwrap();
        }

        let limits = CapacityLimits {
            max_memories: 10,
            delete_batch_size: 3,
        };
        let evicted = enforce_capacity(&conn, "Ada", limits).unwrap();
        assert!(count(&conn, "Ada") <= 10);
        assert_eq!(evicted as i64, 30 - count(&conn, "Ada"));
    }

    #[test]
    fn test_eviction_scoped_to_user() {
        let mut conn = test_db();
        let now = Utc::now();
        for i in 0..5 {
            store_memory(&mut conn, &feeling("Bob", &format!("b{i}"), 0.1), unbounded(), now).unwrap();
        }
        let limits = CapacityLimits {
            max_memories: 2,
            delete_batch_size: 1,
        };
        for i in 0..4 {
            store_memory(&mut conn, &feeling("Ada", &format!("a{i}"), 0.1), limits, now).unwrap();
        }
        assert_eq!(count(&conn, "Ada"), 2);
        assert_eq!(count(&conn, "Bob"), 5);
    }

    #[test]
    fn test_zero_batch_size_still_makes_progress() {
        let mut conn = test_db();
        let limits = CapacityLimits {
            max_memories: 1,
            delete_batch_size: 0,
        };
        for i in 0..3 {
            store_memory(&mut conn, &feeling("Ada", &format!("m{i}"), 0.1), limits, Utc::now()).unwrap();
        }
        assert_eq!(count(&conn, "Ada"), 1);
    }
}
