//! Emotional decay of feeling-type memories.
//!
//! Each pass multiplies a feeling's score by `exp(-decay_rate * hours)`, where
//! `hours` is the time since its `last_accessed`, and then stamps
//! `last_accessed = now`. Chained passes therefore compose exactly:
//! `s * exp(-r*h1) * exp(-r*h2) = s * exp(-r*(h1+h2))`.
//!
//! The sweep is global (every user) and runs in a single transaction. Because
//! it refreshes `last_accessed`, it also moves feelings to the back of the
//! eviction queue.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::memory::{format_timestamp, parse_timestamp};
use crate::memory::types::MemoryType;

#[derive(Debug, Serialize)]
pub struct DecayResult {
    /// Feeling records rewritten by this pass.
    pub affected: usize,
    pub elapsed_ms: u64,
}

/// Multiplier applied to a score after `elapsed_hours`. Negative elapsed time
/// (clock skew) counts as zero, so decay never amplifies a score.
pub fn decay_factor(decay_rate: f64, elapsed_hours: f64) -> f64 {
    (-decay_rate * elapsed_hours.max(0.0)).exp()
}

/// Hours between `last_accessed` and `now`, or zero if the timestamp is
/// unparseable or in the future.
fn elapsed_hours(last_accessed: &str, now: DateTime<Utc>) -> f64 {
    match parse_timestamp(last_accessed) {
        Some(then) => ((now - then).num_milliseconds() as f64 / 3_600_000.0).max(0.0),
        None => {
            tracing::warn!(last_accessed, "unparseable last_accessed, skipping decay for row");
            0.0
        }
    }
}

/// Apply exponential decay to every feeling-type memory.
pub fn apply_decay(conn: &mut Connection, now: DateTime<Utc>) -> Result<DecayResult> {
    let start = std::time::Instant::now();
    let tx = conn.transaction()?;
    let now_str = format_timestamp(now);

    let rows: Vec<(i64, f64, f64, String)> = {
        let mut stmt = tx.prepare(
            "SELECT id, emotional_score, decay_rate, last_accessed \
             FROM memories WHERE memory_type = ?1",
        )?;
        let collected = stmt
            .query_map(params![MemoryType::Feeling.as_i64()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        collected
    };

    {
        let mut update = tx.prepare(
            "UPDATE memories SET emotional_score = ?1, last_accessed = ?2 WHERE id = ?3",
        )?;
        for (id, score, rate, last_accessed) in &rows {
            let decayed = score * decay_factor(*rate, elapsed_hours(last_accessed, now));
            update.execute(params![decayed, now_str, id])?;
        }
    }

    tx.commit()?;

    let result = DecayResult {
        affected: rows.len(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    tracing::debug!(affected = result.affected, elapsed_ms = result.elapsed_ms, "decay pass complete");
    Ok(result)
}
