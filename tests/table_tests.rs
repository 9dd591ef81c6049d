//! Tests for CountTable
//!
//! These tests verify:
//! - Create-or-increment semantics
//! - Snapshot loading via insert
//! - Concurrent increments across shards

use std::collections::HashMap;
use std::thread;

use wordcount::table::CountTable;

#[test]
fn test_increment_creates_then_counts() {
    let table = CountTable::new(4);

    assert_eq!(table.increment("a"), 1);
    assert_eq!(table.increment("a"), 2);
    assert_eq!(table.increment("b"), 1);

    assert_eq!(table.get("a"), Some(2));
    assert_eq!(table.get("b"), Some(1));
    assert_eq!(table.get("c"), None);
    assert_eq!(table.len(), 2);
}

#[test]
fn test_zero_shards_rounds_up() {
    let table = CountTable::new(0);

    assert_eq!(table.shard_count(), 1);
    assert_eq!(table.increment("x"), 1);
}

#[test]
fn test_insert_sets_count_and_skips_zero() {
    let table = CountTable::new(4);

    table.insert("loaded".to_string(), 41);
    table.insert("nothing".to_string(), 0);

    assert_eq!(table.increment("loaded"), 42);
    assert_eq!(table.get("nothing"), None);
}

#[test]
fn test_entries_copy_all_counts() {
    let table = CountTable::default();
    for word in ["one", "two", "two", "three", "three", "three"] {
        table.increment(word);
    }

    let entries: HashMap<String, u64> = table
        .entries()
        .into_iter()
        .map(|wc| (wc.word, wc.count))
        .collect();
    assert_eq!(entries["one"], 1);
    assert_eq!(entries["two"], 2);
    assert_eq!(entries["three"], 3);
    assert_eq!(table.len(), 3);
    assert!(!table.is_empty());
}

#[test]
fn test_concurrent_increments_many_words() {
    let table = CountTable::new(8);

    thread::scope(|scope| {
        for t in 0..10 {
            let table = &table;
            scope.spawn(move || {
                for i in 0..1000 {
                    table.increment(&format!("w{}", (i + t) % 50));
                }
            });
        }
    });

    assert_eq!(table.len(), 50);
    let total: u64 = table.entries().iter().map(|wc| wc.count).sum();
    assert_eq!(total, 10_000);
    for wc in table.entries() {
        assert_eq!(wc.count, 200);
    }
}
