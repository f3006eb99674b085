//! CLI `browse` command: dump stored memories.

use anyhow::Result;

use crate::config::AstraConfig;
use crate::memory::search::list_memories;

/// Print every memory, optionally only those of `user`.
pub fn browse(config: &AstraConfig, user: Option<&str>) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let memories = list_memories(&conn, user)?;
    if memories.is_empty() {
        println!("No memories found.");
        return Ok(());
    }

    for m in &memories {
        println!();
        println!("ID: {}", m.id);
        println!("User: {}", m.user_name);
        println!("Type: {}", m.memory_type);
        println!("Subject: {}", m.subject);
        println!("Value: {}", m.value);
        println!("Emotion Score: {:.2}", m.emotional_score);
        println!("Last accessed: {}", m.last_accessed);
    }

    Ok(())
}
