use anyhow::Result;

use crate::config::AstraConfig;

/// Display memory statistics in the terminal.
pub fn stats(config: &AstraConfig, user: Option<&str>) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let response = crate::memory::stats::memory_stats(&conn, user, Some(&db_path))?;
    let health = crate::db::check_database_health(&conn)?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", response.total_memories);
    println!("  Facts:               {}", response.facts);
    println!("  Feelings:            {}", response.feelings);
    if let Some(mean) = response.mean_feeling_score {
        println!("  Mean feeling score:  {mean:.2}");
    }
    println!();

    if !response.users.is_empty() {
        println!("By User:");
        for u in &response.users {
            println!("  {:<20} {}", u.user_name, u.memories);
        }
        println!();
    }

    println!("Database size:         {} bytes", response.db_size_bytes);
    println!("Schema version:        {}", health.schema_version);
    if health.integrity_ok {
        println!("Integrity:             ok");
    } else {
        println!("Integrity:             FAILED ({})", health.integrity_details);
    }

    if let Some(ref oldest) = response.oldest_memory {
        println!("Oldest memory:         {oldest}");
    }
    if let Some(ref newest) = response.newest_memory {
        println!("Newest memory:         {newest}");
    }

    Ok(())
}
