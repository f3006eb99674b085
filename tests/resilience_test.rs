use astra::config::MemoryConfig;
use astra::db;
use astra::memory::forget::ForgetOutcome;
use astra::memory::types::MemoryType;
use astra::memory::{MemoryError, MemoryStore, WriteOutcome};
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");

    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    assert!(db_path.exists());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn health_check_passes_on_valid_db() {
    let conn = db::open_memory_database().unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.memory_count, 0);
}

#[test]
fn busy_timeout_is_set() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    let conn = db::open_database(&db_path).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn store_survives_across_instances() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("astra.db");
    let config = MemoryConfig::default();

    {
        let store = MemoryStore::open(&db_path, &config).unwrap();
        let outcome = store
            .insert("Ada", "user_name", "Ada", 0.0, MemoryType::Fact)
            .unwrap();
        assert!(matches!(outcome, WriteOutcome::Stored { evicted: 0, .. }));
    }

    let reopened = MemoryStore::open(&db_path, &config).unwrap();
    assert_eq!(reopened.existing_user().as_deref(), Some("Ada"));
    assert_eq!(reopened.top_n("Ada", 5).unwrap().len(), 1);
}

#[test]
fn empty_user_is_a_contract_violation() {
    let tmp = TempDir::new().unwrap();
    let store = MemoryStore::open(tmp.path().join("astra.db"), &MemoryConfig::default()).unwrap();

    assert!(matches!(
        store.insert("  ", "s", "v", 0.0, MemoryType::Fact),
        Err(MemoryError::MissingUser)
    ));
    assert!(matches!(store.top_n("", 5), Err(MemoryError::MissingUser)));
    assert!(matches!(
        store.delete_by_keyword("", "x"),
        Err(MemoryError::MissingUser)
    ));
}

#[test]
fn storage_failure_becomes_sentinel() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("astra.db");
    let store = MemoryStore::open(&db_path, &MemoryConfig::default()).unwrap();

    // Pull the table out from under the facade.
    let conn = db::connect(&db_path).unwrap();
    conn.execute_batch("DROP TABLE memories").unwrap();
    drop(conn);

    assert_eq!(
        store.insert("Ada", "s", "v", 0.0, MemoryType::Fact).unwrap(),
        WriteOutcome::Failed
    );
    assert_eq!(store.delete_by_keyword("Ada", "s").unwrap(), ForgetOutcome::Failed);
    assert!(store.top_n("Ada", 5).unwrap().is_empty());
    assert!(store.apply_decay().is_none());
    assert!(store.existing_user().is_none());
}
