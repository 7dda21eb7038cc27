//! Tests for key/value separation
//!
//! These tests verify:
//! - Large values are resolved through the value log
//! - Addresses stay valid across restarts, flushes and compactions
//! - Flushed segments are retired, not deleted

use std::fs;
use std::path::Path;

use stratakv::{Config, Engine};
use tempfile::TempDir;

const THRESHOLD: usize = 32;

fn open(dir: &Path) -> Engine {
    Engine::open(
        Config::builder()
            .data_dir(dir)
            .value_log_threshold(THRESHOLD)
            .level_table_threshold(1)
            .build(),
    )
    .unwrap()
}

fn large(i: usize) -> Vec<u8> {
    format!("{:0>64}", i).into_bytes()
}

fn count_with_extension(dir: &Path, ext: &str) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .map_or(false, |x| x == ext)
        })
        .count()
}

#[test]
fn test_separated_layout() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open(temp_dir.path());

    engine.put(b"big", &large(1)).unwrap();
    engine.put(b"small", b"tiny").unwrap();

    assert!(temp_dir.path().join("key").is_dir());
    assert!(temp_dir.path().join("value").is_dir());
    assert_eq!(engine.get(b"big").unwrap(), Some(large(1)));
    assert_eq!(engine.get(b"small").unwrap(), Some(b"tiny".to_vec()));
}

#[test]
fn test_values_resolve_after_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = open(temp_dir.path());
        for i in 0..20 {
            engine.put(format!("k{:02}", i).as_bytes(), &large(i)).unwrap();
        }
        engine.delete(b"k05").unwrap();
    }

    let engine = open(temp_dir.path());

    for i in 0..20 {
        let expected = if i == 5 { None } else { Some(large(i)) };
        assert_eq!(engine.get(format!("k{:02}", i).as_bytes()).unwrap(), expected);
    }
}

#[test]
fn test_values_resolve_after_flush_and_compaction() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open(temp_dir.path());

    for round in 0..4 {
        for i in 0..10 {
            let key = format!("k{:02}", round * 10 + i);
            engine.put(key.as_bytes(), &large(round * 10 + i)).unwrap();
        }
        // Overwrite a key from the first round every time
        engine.put(b"k00", &large(1000 + round)).unwrap();
        engine.flush().unwrap();
    }
    engine.sync_background().unwrap();

    let stats = engine.stats();
    assert!(stats.compactions_per_level[0] >= 1);
    assert_eq!(engine.get(b"k00").unwrap(), Some(large(1003)));
    for n in 1..40 {
        assert_eq!(
            engine.get(format!("k{:02}", n).as_bytes()).unwrap(),
            Some(large(n))
        );
    }

    // Flushed segments stay around for the addresses in the tables
    let value_dir = temp_dir.path().join("value");
    assert_eq!(count_with_extension(&value_dir, "vlog"), 4);
    assert!(count_with_extension(&temp_dir.path().join("key"), "sst") >= 1);
}

#[test]
fn test_values_resolve_after_close_and_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = open(temp_dir.path());
        engine.put(b"big", &large(7)).unwrap();
        engine.put(b"small", b"x").unwrap();
        engine.close().unwrap();
    }

    let engine = open(temp_dir.path());

    assert_eq!(engine.stats().memtable_entries, 0);
    assert_eq!(engine.get(b"big").unwrap(), Some(large(7)));
    assert_eq!(engine.get(b"small").unwrap(), Some(b"x".to_vec()));
}
