//! CLI `decay` command: run one decay sweep outside a conversation.

use anyhow::Result;
use chrono::Utc;

use crate::config::AstraConfig;
use crate::memory::maintenance;

pub fn decay(config: &AstraConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let mut conn = crate::db::open_database(&db_path)?;

    println!("Applying emotional decay...");
    let result = maintenance::apply_decay(&mut conn, Utc::now())?;

    if result.affected > 0 {
        println!("  Decayed {} feeling memories.", result.affected);
    } else {
        println!("  No memories to decay.");
    }

    Ok(())
}
