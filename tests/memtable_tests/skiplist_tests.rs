//! Tests for the skip list
//!
//! These tests verify:
//! - Sorted level-0 order under random inserts
//! - In-place overwrite of existing keys
//! - Tombstones shadowing values
//! - Tower and link invariants
//! - Flush to a sorted SSTable

use stratakv::memtable::SkipList;
use stratakv::storage::SSTableIterator;
use stratakv::{Entry, EntryValue, StrataError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn new_list() -> SkipList {
    SkipList::with_seed(0.5, 16, 0xC0FFEE)
}

fn inline(v: &[u8]) -> EntryValue {
    EntryValue::Inline(v.to_vec())
}

/// Deterministic shuffle of 0..n (multiplicative step, n prime-friendly)
fn shuffled(n: u64) -> Vec<u64> {
    (0..n).map(|i| (i * 7919) % n).collect()
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_empty_list() {
    let list = new_list();

    assert!(list.is_empty());
    assert_eq!(list.len(), 0);
    assert_eq!(list.height(), 0);
    assert_eq!(list.search(b"anything"), None);
    assert_eq!(list.iter().count(), 0);
    list.check_invariants().unwrap();
}

#[test]
fn test_put_then_search() {
    let mut list = new_list();

    assert!(list.put(b"hello".to_vec(), inline(b"world")));

    assert_eq!(list.search(b"hello"), Some(inline(b"world")));
    assert_eq!(list.search(b"hell"), None);
    assert_eq!(list.search(b"hello!"), None);
}

#[test]
fn test_overwrite_updates_in_place() {
    let mut list = new_list();

    assert!(list.put(b"k".to_vec(), inline(b"v1")));
    assert!(!list.put(b"k".to_vec(), inline(b"v2")));

    assert_eq!(list.len(), 1);
    assert_eq!(list.search(b"k"), Some(inline(b"v2")));
    list.check_invariants().unwrap();
}

#[test]
fn test_remove_shadows_value() {
    let mut list = new_list();
    list.put(b"a".to_vec(), inline(b"1"));
    list.put(b"b".to_vec(), inline(b"2"));

    assert!(!list.remove(b"a".to_vec()));

    assert_eq!(list.search(b"a"), Some(EntryValue::Tombstone));
    assert_eq!(list.keys(), vec![b"b".to_vec()]);
    // Tombstones still count
    assert_eq!(list.len(), 2);
}

#[test]
fn test_remove_absent_key_inserts_tombstone() {
    let mut list = new_list();

    assert!(list.remove(b"ghost".to_vec()));

    assert_eq!(list.len(), 1);
    assert_eq!(list.search(b"ghost"), Some(EntryValue::Tombstone));
    assert!(list.keys().is_empty());
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_iteration_sorted_after_random_inserts() {
    let mut list = new_list();
    for i in shuffled(1000) {
        list.put(format!("key{:04}", i).into_bytes(), inline(&i.to_le_bytes()));
    }

    let keys: Vec<Vec<u8>> = list.iter().map(|(k, _)| k.to_vec()).collect();
    let mut expected = keys.clone();
    expected.sort();

    assert_eq!(keys.len(), 1000);
    assert_eq!(keys, expected);
    list.check_invariants().unwrap();
}

#[test]
fn test_byte_order_is_unsigned_and_prefix_first() {
    let mut list = new_list();
    let inserted: Vec<Vec<u8>> = vec![
        b"b".to_vec(),
        b"ab".to_vec(),
        b"a".to_vec(),
        vec![0xff],
        vec![0x7f],
        Vec::new(),
    ];
    for key in &inserted {
        list.put(key.clone(), inline(b"x"));
    }

    let keys: Vec<Vec<u8>> = list.iter().map(|(k, _)| k.to_vec()).collect();

    let expected: Vec<Vec<u8>> = vec![
        Vec::new(),
        vec![0x7f],
        b"a".to_vec(),
        b"ab".to_vec(),
        b"b".to_vec(),
        vec![0xff],
    ];
    assert_eq!(keys, expected);
}

#[test]
fn test_height_grows_but_stays_capped() {
    let mut list = SkipList::with_seed(0.5, 4, 99);
    for i in 0..2000u32 {
        list.put(i.to_be_bytes().to_vec(), inline(b"v"));
    }

    assert!(list.height() > 0);
    assert!(list.height() <= 4);
    list.check_invariants().unwrap();
}

#[test]
fn test_overwrites_keep_invariants() {
    let mut list = new_list();
    for round in 0..3u8 {
        for i in shuffled(200) {
            list.put(format!("k{:03}", i).into_bytes(), inline(&[round]));
        }
    }

    assert_eq!(list.len(), 200);
    assert!(list.iter().all(|(_, v)| *v == inline(&[2])));
    list.check_invariants().unwrap();
}

// =============================================================================
// Flush
// =============================================================================

#[test]
fn test_flush_writes_every_entry_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flush.sst");

    let mut list = new_list();
    for i in shuffled(100) {
        list.put(format!("key{:03}", i).into_bytes(), inline(b"v"));
    }
    list.remove(b"key050".to_vec());

    let summary = list.flush(&path).unwrap();

    assert_eq!(summary.entry_count, 100);
    assert_eq!(summary.min_key, b"key000".to_vec());
    assert_eq!(summary.max_key, b"key099".to_vec());

    let entries: Vec<Entry> = SSTableIterator::open(&path)
        .unwrap()
        .collect::<Result<_, StrataError>>()
        .unwrap();
    let expected: Vec<Entry> = list
        .iter()
        .map(|(k, v)| Entry::new(k.to_vec(), v.clone()))
        .collect();
    assert_eq!(entries, expected);
    assert!(entries[50].is_tombstone());
}
