mod helpers;

use astra::memory::maintenance::apply_decay;
use astra::memory::types::MemoryType;
use chrono::Duration;
use helpers::{base_time, insert_at, score_of, test_db};
use rusqlite::params;

#[test]
fn decay_only_touches_feelings() {
    let mut conn = test_db();
    let start = base_time();
    let fact = insert_at(&mut conn, "Ada", "fact", 0.6, MemoryType::Fact, start);
    let feeling = insert_at(&mut conn, "Ada", "feeling", 0.6, MemoryType::Feeling, start);

    let result = apply_decay(&mut conn, start + Duration::hours(10)).unwrap();
    assert_eq!(result.affected, 1);

    assert_eq!(score_of(&conn, fact), 0.6);
    let expected = 0.6 * (-0.05f64 * 10.0).exp();
    assert!((score_of(&conn, feeling) - expected).abs() < 1e-9);
}

#[test]
fn repeated_passes_compose() {
    let mut conn = test_db();
    let start = base_time();
    let id = insert_at(&mut conn, "Ada", "feeling", -0.9, MemoryType::Feeling, start);

    // Three uneven passes: 2h, 5h, 0.5h.
    let mut at = start;
    for minutes in [120, 300, 30] {
        at += Duration::minutes(minutes);
        apply_decay(&mut conn, at).unwrap();
    }

    let expected = -0.9 * (-0.05f64 * 7.5).exp();
    assert!((score_of(&conn, id) - expected).abs() < 1e-9);
}

#[test]
fn decay_never_flips_sign_or_grows() {
    let mut conn = test_db();
    let start = base_time();
    let neg = insert_at(&mut conn, "Ada", "n", -0.7, MemoryType::Feeling, start);
    let pos = insert_at(&mut conn, "Ada", "p", 0.7, MemoryType::Feeling, start);

    apply_decay(&mut conn, start + Duration::days(3)).unwrap();

    let n = score_of(&conn, neg);
    let p = score_of(&conn, pos);
    assert!(n < 0.0 && n > -0.7);
    assert!(p > 0.0 && p < 0.7);
}

#[test]
fn clock_skew_does_not_amplify() {
    let mut conn = test_db();
    let start = base_time();
    let id = insert_at(&mut conn, "Ada", "feeling", 0.5, MemoryType::Feeling, start);

    apply_decay(&mut conn, start - Duration::hours(5)).unwrap();
    assert_eq!(score_of(&conn, id), 0.5);
}

#[test]
fn decay_refreshes_last_accessed() {
    let mut conn = test_db();
    let start = base_time();
    let id = insert_at(&mut conn, "Ada", "feeling", 0.5, MemoryType::Feeling, start);

    apply_decay(&mut conn, start + Duration::hours(1)).unwrap();

    let last: String = conn
        .query_row(
            "SELECT last_accessed FROM memories WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(last, "2026-10-18T10:00:00.000Z");
}

#[test]
fn decay_on_empty_store_is_a_no_op() {
    let mut conn = test_db();
    let result = apply_decay(&mut conn, base_time()).unwrap();
    assert_eq!(result.affected, 0);
}
