use anyhow::Result;
use rusqlite::{params, Connection, ToSql};
use serde::Serialize;
use std::path::Path;

/// Response from memory_stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_memories: u64,
    pub facts: u64,
    pub feelings: u64,
    pub users: Vec<UserCount>,
    /// Mean score over feeling-type records, if there are any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_feeling_score: Option<f64>,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserCount {
    pub user_name: String,
    pub memories: u64,
}

/// Compute memory store statistics.
///
/// If `user` is provided, counts are filtered to that user.
/// `db_path` is used for file size calculation; pass None for in-memory databases.
pub fn memory_stats(conn: &Connection, user: Option<&str>, db_path: Option<&Path>) -> Result<StatsResponse> {
    let (where_clause, param) = user_filter(user);
    let args: Vec<&dyn ToSql> = match &param {
        Some(u) => vec![u as &dyn ToSql],
        None => Vec::new(),
    };

    let (total, facts, feelings, mean_feeling_score, oldest, newest): (
        i64,
        i64,
        i64,
        Option<f64>,
        Option<String>,
        Option<String>,
    ) = conn.query_row(
        &format!(
            "SELECT COUNT(*), \
                    COALESCE(SUM(memory_type = 0), 0), \
                    COALESCE(SUM(memory_type = 1), 0), \
                    AVG(CASE WHEN memory_type = 1 THEN emotional_score END), \
                    MIN(created_at), MAX(created_at) \
             FROM memories {where_clause}"
        ),
        args.as_slice(),
        |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        },
    )?;

    let users = count_by_user(conn, user)?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StatsResponse {
        total_memories: total as u64,
        facts: facts as u64,
        feelings: feelings as u64,
        users,
        mean_feeling_score,
        db_size_bytes,
        oldest_memory: oldest,
        newest_memory: newest,
    })
}

fn count_by_user(conn: &Connection, user: Option<&str>) -> Result<Vec<UserCount>> {
    let map = |row: &rusqlite::Row<'_>| -> rusqlite::Result<UserCount> {
        Ok(UserCount {
            user_name: row.get(0)?,
            memories: row.get::<_, i64>(1)? as u64,
        })
    };

    let rows = if let Some(u) = user {
        let mut stmt = conn.prepare(
            "SELECT user_name, COUNT(*) FROM memories WHERE user_name = ?1 GROUP BY user_name",
        )?;
        let collected = stmt.query_map(params![u], map)?.collect::<Result<Vec<_>, _>>()?;
        collected
    } else {
        let mut stmt = conn.prepare(
            "SELECT user_name, COUNT(*) FROM memories GROUP BY user_name ORDER BY user_name",
        )?;
        let collected = stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?;
        collected
    };
    Ok(rows)
}

/// Build a WHERE clause for optional user filtering.
fn user_filter(user: Option<&str>) -> (String, Option<String>) {
    match user {
        Some(u) => ("WHERE user_name = ?1".to_string(), Some(u.to_string())),
        None => (String::new(), None),
    }
}
