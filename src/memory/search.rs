//! Read path: relevance ranking and plain listing.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::memory::format_timestamp;
use crate::memory::types::{Memory, MemoryType};

/// Days after which the recency multiplier of [`relevant_memories`] reaches zero.
pub const RECENCY_HORIZON_DAYS: f64 = 30.0;

/// A memory selected as context for a model call.
#[derive(Debug, Clone, Serialize)]
pub struct RankedMemory {
    pub id: i64,
    pub subject: String,
    pub value: String,
    pub emotional_score: f64,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// `emotional_score * (1 - age_days / 30)`. Never persisted.
    pub rank_score: f64,
}

/// Top `limit` memories of `user_name`, most relevant first.
///
/// `rank_score = emotional_score * (1 - age_days / 30)` with age measured from
/// `last_accessed`. Past 30 days the multiplier turns negative, which flips the
/// ordering of old records: an old strongly negative memory can outrank a
/// fresh mildly positive one. Ties fall back to ascending id.
pub fn relevant_memories(
    conn: &Connection,
    user_name: &str,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<RankedMemory>> {
    let mut stmt = conn.prepare(
        "SELECT id, subject, value, emotional_score, memory_type, \
                emotional_score * (1.0 - (julianday(?2) - julianday(last_accessed)) / ?3) AS rank_score \
         FROM memories \
         WHERE user_name = ?1 \
         ORDER BY rank_score DESC, id ASC \
         LIMIT ?4",
    )?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let results = stmt
        .query_map(
            params![user_name, format_timestamp(now), RECENCY_HORIZON_DAYS, limit],
            |row| {
                Ok(RankedMemory {
                    id: row.get(0)?,
                    subject: row.get(1)?,
                    value: row.get(2)?,
                    emotional_score: row.get(3)?,
                    memory_type: row.get(4)?,
                    rank_score: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

/// All memories, optionally filtered to one user, in insertion order.
pub fn list_memories(conn: &Connection, user_name: Option<&str>) -> Result<Vec<Memory>> {
    let base = format!("SELECT {} FROM memories", Memory::COLUMNS);
    let memories = match user_name {
        Some(user) => {
            let mut stmt = conn.prepare(&format!("{base} WHERE user_name = ?1 ORDER BY id"))?;
            let rows = stmt
                .query_map(params![user], Memory::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!("{base} ORDER BY id"))?;
            let rows = stmt
                .query_map([], Memory::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(memories)
}

/// The user who owns the oldest stored memory, if any. Used to greet a
/// returning user without asking for their name.
pub fn existing_user(conn: &Connection) -> Result<Option<String>> {
    let user = conn
        .query_row(
            "SELECT user_name FROM memories ORDER BY id LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(user)
}
