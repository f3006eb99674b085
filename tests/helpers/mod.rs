#![allow(dead_code)]

use astra::db;
use astra::memory::store::{store_memory, CapacityLimits, NewMemory};
use astra::memory::types::MemoryType;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Fixed reference instant so timestamp arithmetic is exact.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
}

pub fn roomy_limits() -> CapacityLimits {
    CapacityLimits {
        max_memories: 10_000,
        delete_batch_size: 100,
    }
}

/// Insert a memory at `at` with generous capacity. Returns the row id.
pub fn insert_at(
    conn: &mut Connection,
    user: &str,
    subject: &str,
    score: f64,
    memory_type: MemoryType,
    at: DateTime<Utc>,
) -> i64 {
    let memory = NewMemory {
        user_name: user,
        subject,
        value: "value",
        emotional_score: score,
        decay_rate: 0.05,
        memory_type,
    };
    store_memory(conn, &memory, roomy_limits(), at).unwrap().id
}

pub fn score_of(conn: &Connection, id: i64) -> f64 {
    conn.query_row(
        "SELECT emotional_score FROM memories WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .unwrap()
}

pub fn count_for(conn: &Connection, user: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE user_name = ?1",
        params![user],
        |row| row.get(0),
    )
    .unwrap()
}
