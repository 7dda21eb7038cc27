//! Tests for the Engine read/write path
//!
//! These tests verify:
//! - Basic put/get/delete semantics
//! - MemTable rotation and background flushes
//! - Compaction through the public API
//! - Concurrent readers alongside a writer
//! - Graceful close and reopen

use std::fs;
use std::thread;

use stratakv::{Config, Engine, StrataError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&temp_dir).build()).unwrap();
    (temp_dir, engine)
}

fn config(temp_dir: &TempDir) -> stratakv::ConfigBuilder {
    Config::builder().data_dir(temp_dir.path())
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_put_get() {
    let (_temp, engine) = setup_engine();

    engine.put(b"hello", b"world").unwrap();

    assert_eq!(engine.get(b"hello").unwrap(), Some(b"world".to_vec()));
}

#[test]
fn test_get_missing_key() {
    let (_temp, engine) = setup_engine();

    assert_eq!(engine.get(b"nope").unwrap(), None);
}

#[test]
fn test_overwrite_returns_latest() {
    let (_temp, engine) = setup_engine();

    engine.put(b"k", b"v1").unwrap();
    engine.put(b"k", b"v2").unwrap();

    assert_eq!(engine.get(b"k").unwrap(), Some(b"v2".to_vec()));
    assert_eq!(engine.stats().memtable_entries, 1);
}

#[test]
fn test_delete_hides_value() {
    let (_temp, engine) = setup_engine();

    engine.put(b"k", b"v").unwrap();
    engine.delete(b"k").unwrap();

    assert_eq!(engine.get(b"k").unwrap(), None);
    // The tombstone still counts as an entry
    assert_eq!(engine.stats().memtable_entries, 1);
}

#[test]
fn test_delete_missing_key_is_ok() {
    let (_temp, engine) = setup_engine();

    engine.delete(b"never-written").unwrap();

    assert_eq!(engine.get(b"never-written").unwrap(), None);
}

#[test]
fn test_empty_key_and_value() {
    let (_temp, engine) = setup_engine();

    engine.put(b"", b"empty key").unwrap();
    engine.put(b"empty value", b"").unwrap();

    assert_eq!(engine.get(b"").unwrap(), Some(b"empty key".to_vec()));
    assert_eq!(engine.get(b"empty value").unwrap(), Some(Vec::new()));
}

#[test]
fn test_open_path() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();

    engine.put(b"a", b"1").unwrap();

    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.data_dir(), temp_dir.path());
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let result = Engine::open(config(&temp_dir).memtable_entry_limit(0).build());
    assert!(matches!(result, Err(StrataError::Config(_))));

    let result = Engine::open(config(&temp_dir).max_level_count(1).build());
    assert!(matches!(result, Err(StrataError::Config(_))));
}

// =============================================================================
// Rotation & Flush
// =============================================================================

#[test]
fn test_rotation_at_entry_limit() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&temp_dir).memtable_entry_limit(5).build()).unwrap();

    for i in 0..6 {
        engine
            .put(format!("key{}", i).as_bytes(), b"value")
            .unwrap();
    }

    // Rotated on the sixth entry
    assert_eq!(engine.stats().memtable_entries, 0);
    // Readable whether or not the flush has finished
    assert_eq!(engine.get(b"key3").unwrap(), Some(b"value".to_vec()));

    engine.sync_background().unwrap();

    let stats = engine.stats();
    assert_eq!(stats.immutable_memtables, 0);
    assert_eq!(stats.tables_per_level[0], 1);
    assert_eq!(engine.level_tables(0)[0].entry_count, 6);
    for i in 0..6 {
        assert_eq!(
            engine.get(format!("key{}", i).as_bytes()).unwrap(),
            Some(b"value".to_vec())
        );
    }
}

#[test]
fn test_flush_empty_memtable_is_noop() {
    let (_temp, engine) = setup_engine();

    engine.flush().unwrap();
    engine.sync_background().unwrap();

    assert_eq!(engine.stats().tables_per_level[0], 0);
}

#[test]
fn test_memtable_shadows_flushed_tables() {
    let (_temp, engine) = setup_engine();

    engine.put(b"k", b"flushed").unwrap();
    engine.put(b"gone", b"soon").unwrap();
    engine.flush().unwrap();
    engine.sync_background().unwrap();

    engine.put(b"k", b"fresh").unwrap();
    engine.delete(b"gone").unwrap();

    assert_eq!(engine.get(b"k").unwrap(), Some(b"fresh".to_vec()));
    assert_eq!(engine.get(b"gone").unwrap(), None);

    // Still shadowed once the newer memtable is on disk too
    engine.flush().unwrap();
    engine.sync_background().unwrap();
    assert_eq!(engine.get(b"k").unwrap(), Some(b"fresh".to_vec()));
    assert_eq!(engine.get(b"gone").unwrap(), None);
}

// =============================================================================
// Compaction
// =============================================================================

#[test]
fn test_single_entry_flushes_compact_into_level1() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&temp_dir).level_table_threshold(2).build()).unwrap();

    for i in 0..10 {
        let key = i.to_string();
        engine.put(key.as_bytes(), format!("value{}", i).as_bytes()).unwrap();
        engine.flush().unwrap();
        engine.sync_background().unwrap();

        if i == 2 {
            let stats = engine.stats();
            assert!(stats.compactions_per_level[0] >= 1);
            assert!(stats.tables_per_level[1] >= 1);
        }
    }

    let stats = engine.stats();
    for level in 0..stats.tables_per_level.len() - 1 {
        assert!(stats.tables_per_level[level] <= 2);
    }
    for i in 0..10 {
        assert_eq!(
            engine.get(i.to_string().as_bytes()).unwrap(),
            Some(format!("value{}", i).into_bytes())
        );
    }
    engine.health().unwrap();
}

#[test]
fn test_deletes_survive_compaction() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&temp_dir).level_table_threshold(1).build()).unwrap();

    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();
    engine.flush().unwrap();
    engine.delete(b"a").unwrap();
    engine.flush().unwrap();
    engine.sync_background().unwrap();

    assert!(engine.stats().compactions_per_level[0] >= 1);
    assert_eq!(engine.get(b"a").unwrap(), None);
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_readers_with_writer() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&temp_dir).memtable_entry_limit(50).build()).unwrap();
    for i in 0..200 {
        engine
            .put(format!("stable{:03}", i).as_bytes(), b"fixed")
            .unwrap();
    }

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..3 {
                    for i in 0..200 {
                        let key = format!("stable{:03}", i);
                        assert_eq!(
                            engine.get(key.as_bytes()).unwrap(),
                            Some(b"fixed".to_vec()),
                            "{}",
                            key
                        );
                    }
                }
            });
        }
        scope.spawn(|| {
            for i in 0..300 {
                engine
                    .put(format!("moving{:03}", i).as_bytes(), b"x")
                    .unwrap();
            }
        });
    });

    engine.sync_background().unwrap();
    assert_eq!(engine.get(b"moving299").unwrap(), Some(b"x".to_vec()));
    assert_eq!(engine.get(b"stable000").unwrap(), Some(b"fixed".to_vec()));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_close_and_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config(&temp_dir).build()).unwrap();
        engine.put(b"persist", b"me").unwrap();
        engine.put(b"drop", b"me").unwrap();
        engine.delete(b"drop").unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(config(&temp_dir).build()).unwrap();

    assert_eq!(engine.get(b"persist").unwrap(), Some(b"me".to_vec()));
    assert_eq!(engine.get(b"drop").unwrap(), None);
    // close() flushed the memtable
    assert_eq!(engine.stats().tables_per_level[0], 1);
    assert_eq!(engine.stats().memtable_entries, 0);
}

#[test]
fn test_close_leaves_no_logs() {
    let temp_dir = TempDir::new().unwrap();
    let log_files = |dir: &TempDir| {
        fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .path()
                    .extension()
                    .map_or(false, |x| x == "wal")
            })
            .count()
    };

    // Nothing written
    Engine::open(config(&temp_dir).build()).unwrap().close().unwrap();
    assert_eq!(log_files(&temp_dir), 0);

    let engine = Engine::open(config(&temp_dir).build()).unwrap();
    engine.put(b"k", b"v").unwrap();
    engine.close().unwrap();
    assert_eq!(log_files(&temp_dir), 0);

    let engine = Engine::open(config(&temp_dir).build()).unwrap();
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(log_files(&temp_dir), 1);
}

#[test]
fn test_stats_shape_follows_config() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&temp_dir).max_level_count(4).build()).unwrap();

    let stats = engine.stats();

    assert_eq!(stats.tables_per_level, vec![0; 4]);
    assert_eq!(stats.compactions_per_level, vec![0; 4]);
    assert_eq!(stats.immutable_memtables, 0);
    engine.health().unwrap();
}
