//! Core memory type definitions.
//!
//! Defines [`MemoryType`] (fact vs. feeling) and [`Memory`] (a full record of
//! the `memories` table).

use serde::{Deserialize, Serialize};

/// Maximum length of a memory's subject, in characters.
pub const SUBJECT_MAX_CHARS: usize = 60;

/// The two kinds of memory. Stored as an integer in the `memory_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Static score; written by explicit "remember" requests and bookkeeping.
    Fact,
    /// Emotional statement whose score decays over time.
    Feeling,
}

impl MemoryType {
    /// SQL column value.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Fact => 0,
            Self::Feeling => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Fact),
            1 => Some(Self::Feeling),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Feeling => "feeling",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fact" => Ok(Self::Fact),
            "feeling" => Ok(Self::Feeling),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

impl rusqlite::types::FromSql for MemoryType {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let raw = value.as_i64()?;
        Self::from_i64(raw).ok_or(rusqlite::types::FromSqlError::OutOfRange(raw))
    }
}

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Monotonically assigned row id.
    pub id: i64,
    /// Owning user. Treated as an opaque key.
    pub user_name: String,
    /// Short label, at most [`SUBJECT_MAX_CHARS`] characters.
    pub subject: String,
    /// The stored fact or the reply tied to the triggering input.
    pub value: String,
    /// Signed valence; magnitude is intensity.
    pub emotional_score: f64,
    /// Exponential attenuation per hour (feelings only).
    pub decay_rate: f64,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last decay pass. Doubles as the eviction
    /// recency signal.
    pub last_accessed: String,
}

impl Memory {
    /// Column list matching [`Memory::from_row`].
    pub const COLUMNS: &'static str = "id, user_name, subject, value, emotional_score, \
         decay_rate, memory_type, created_at, last_accessed";

    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_name: row.get(1)?,
            subject: row.get(2)?,
            value: row.get(3)?,
            emotional_score: row.get(4)?,
            decay_rate: row.get(5)?,
            memory_type: row.get(6)?,
            created_at: row.get(7)?,
            last_accessed: row.get(8)?,
        })
    }
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
