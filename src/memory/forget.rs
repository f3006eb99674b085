//! Keyword-based forgetting.
//!
//! Deletes every memory of a user whose subject or value contains the keyword,
//! case-insensitively. There is no soft delete: forgotten rows are gone.

use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;

/// Outcome of a forget request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForgetOutcome {
    /// The request ran; `deleted` may be zero.
    Forgotten { deleted: usize },
    /// Keyword was empty or whitespace. Nothing was touched; ask again.
    EmptyKeyword,
    /// The store could not be reached. Already logged.
    Failed,
}

/// Delete all of `user_name`'s memories matching `keyword` in subject or value.
///
/// Matching is a plain substring test after lower-casing both sides in SQL, so
/// `%` and `_` in the keyword are literal characters.
pub fn forget_by_keyword(conn: &mut Connection, user_name: &str, keyword: &str) -> Result<ForgetOutcome> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(ForgetOutcome::EmptyKeyword);
    }

    let tx = conn.transaction()?;
    let deleted = tx.execute(
        "DELETE FROM memories \
         WHERE user_name = ?1 \
           AND (instr(LOWER(subject), LOWER(?2)) > 0 OR instr(LOWER(value), LOWER(?2)) > 0)",
        params![user_name, keyword],
    )?;
    tx.commit()?;

    tracing::info!(user = %user_name, keyword = %keyword, deleted, "memories forgotten");
    Ok(ForgetOutcome::Forgotten { deleted })
}
