//! Configuration for StrataKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StrataError};

/// Main configuration for a StrataKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure (inline WAL mode):
    ///   {data_dir}/
    ///     ├── MANIFEST
    ///     ├── wal_active_<id>.wal
    ///     ├── wal_silence_<id>.wal
    ///     └── sstable_<id>.sst
    /// With a value-log threshold set, tables go to `key/` and logs to `value/`.
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the log
    pub wal_sync_strategy: WalSyncStrategy,

    /// Values longer than this many bytes are kept out of the memtable and
    /// referenced by value-log address. `None` selects the inline WAL.
    pub value_log_threshold: Option<usize>,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Max entries in the memtable before it is rotated out and flushed
    pub memtable_entry_limit: usize,

    /// Promotion probability per skip list insert attempt
    pub skiplist_probability: f64,

    /// Hard cap on skip list index levels
    pub skiplist_max_level: usize,

    // -------------------------------------------------------------------------
    // Level Configuration
    // -------------------------------------------------------------------------
    /// Max entries written to one SSTable by compaction
    pub max_sstable_entries: u64,

    /// Number of levels (level 0 ..= max_level_count - 1)
    pub max_level_count: u32,

    /// A level holding more tables than this is compacted into the next one
    pub level_table_threshold: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./stratakv_data"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            value_log_threshold: None,
            memtable_entry_limit: 10_000,
            skiplist_probability: 0.5,
            skiplist_max_level: 32,
            max_sstable_entries: 10_000,
            max_level_count: 7,
            level_table_threshold: 2,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.memtable_entry_limit == 0 {
            return Err(StrataError::Config(
                "memtable_entry_limit must be at least 1".to_string(),
            ));
        }
        if !(self.skiplist_probability > 0.0 && self.skiplist_probability < 1.0) {
            return Err(StrataError::Config(format!(
                "skiplist_probability must be in (0, 1), got {}",
                self.skiplist_probability
            )));
        }
        if self.max_sstable_entries == 0 {
            return Err(StrataError::Config(
                "max_sstable_entries must be at least 1".to_string(),
            ));
        }
        if self.max_level_count < 2 {
            return Err(StrataError::Config(format!(
                "max_level_count must be at least 2, got {}",
                self.max_level_count
            )));
        }
        if self.level_table_threshold == 0 {
            return Err(StrataError::Config(
                "level_table_threshold must be at least 1".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(StrataError::Config(
                "EveryNEntries sync count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Enable key/value separation for values longer than `bytes`
    pub fn value_log_threshold(mut self, bytes: usize) -> Self {
        self.config.value_log_threshold = Some(bytes);
        self
    }

    /// Set the memtable entry limit
    pub fn memtable_entry_limit(mut self, entries: usize) -> Self {
        self.config.memtable_entry_limit = entries;
        self
    }

    /// Set the skip list promotion probability
    pub fn skiplist_probability(mut self, probability: f64) -> Self {
        self.config.skiplist_probability = probability;
        self
    }

    /// Set the skip list level cap
    pub fn skiplist_max_level(mut self, levels: usize) -> Self {
        self.config.skiplist_max_level = levels;
        self
    }

    /// Set the max entries per compaction output table
    pub fn max_sstable_entries(mut self, entries: u64) -> Self {
        self.config.max_sstable_entries = entries;
        self
    }

    /// Set the number of levels
    pub fn max_level_count(mut self, levels: u32) -> Self {
        self.config.max_level_count = levels;
        self
    }

    /// Set the per-level table count that triggers compaction
    pub fn level_table_threshold(mut self, tables: usize) -> Self {
        self.config.level_table_threshold = tables;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
