//! MemTable implementation
//!
//! Skip list behind an RwLock, fed through a durability log.

use std::path::Path;

use parking_lot::{Mutex, RwLock};

use crate::config::{Config, WalSyncStrategy};
use crate::entry::{EntryValue, ValueAddress};
use crate::error::{Result, StrataError};
use crate::layout::{Layout, LogKind, LogState};
use crate::storage::sstable::TableSummary;
use crate::wal::{self, LogRecord, LogRecovery, LogWriter, RecoveryResult};

use super::SkipList;

/// Settings every memtable is built with
#[derive(Debug, Clone)]
pub struct MemTableOptions {
    pub skiplist_probability: f64,
    pub skiplist_max_level: usize,
    pub sync_strategy: WalSyncStrategy,
    /// Values longer than this are stored as value-log addresses
    pub value_log_threshold: Option<usize>,
}

impl MemTableOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            skiplist_probability: config.skiplist_probability,
            skiplist_max_level: config.skiplist_max_level,
            sync_strategy: config.wal_sync_strategy,
            value_log_threshold: config.value_log_threshold,
        }
    }
}

/// In-memory table for recent writes
///
/// ## Concurrency:
/// - `list`: RwLock, concurrent lookups, exclusive inserts
/// - `log`: Mutex, `None` once the log has been sealed
pub struct MemTable {
    /// Id of the log backing this memtable
    id: u64,
    layout: Layout,
    list: RwLock<SkipList>,
    log: Mutex<Option<LogWriter>>,
    options: MemTableOptions,
}

impl MemTable {
    /// Create a new empty MemTable with a fresh active log
    pub fn create(layout: &Layout, id: u64, options: MemTableOptions) -> Result<Self> {
        let writer = LogWriter::create(layout, id, options.sync_strategy)?;
        Ok(Self::assemble(layout, id, Some(writer), options))
    }

    /// Rebuild a MemTable from the active log left by a previous run and
    /// keep appending to it.
    pub fn recover_active(
        layout: &Layout,
        id: u64,
        options: MemTableOptions,
    ) -> Result<(Self, RecoveryResult)> {
        let path = layout.log_path(id, LogState::Active);
        let (records, result) = LogRecovery::recover(&path, layout.log_kind())?;
        let writer = LogWriter::reopen(layout, id, result.valid_len, options.sync_strategy)?;

        let table = Self::assemble(layout, id, Some(writer), options);
        table.replay(records);
        Ok((table, result))
    }

    /// Rebuild a sealed MemTable from a silence log. It accepts no writes.
    pub fn recover_sealed(
        layout: &Layout,
        id: u64,
        options: MemTableOptions,
    ) -> Result<(Self, RecoveryResult)> {
        let path = layout.log_path(id, LogState::Silence);
        let (records, result) = LogRecovery::recover(&path, layout.log_kind())?;

        let table = Self::assemble(layout, id, None, options);
        table.replay(records);
        Ok((table, result))
    }

    fn assemble(
        layout: &Layout,
        id: u64,
        writer: Option<LogWriter>,
        options: MemTableOptions,
    ) -> Self {
        let list = SkipList::new(options.skiplist_probability, options.skiplist_max_level);
        Self {
            id,
            layout: layout.clone(),
            list: RwLock::new(list),
            log: Mutex::new(writer),
            options,
        }
    }

    fn replay(&self, records: Vec<(u64, LogRecord)>) {
        let mut list = self.list.write();
        for (offset, record) in records {
            let value = self.entry_value(offset, record.value);
            list.put(record.key, value);
        }
    }

    /// What the skip list stores for a record logged at `offset`
    fn entry_value(&self, offset: u64, value: Option<Vec<u8>>) -> EntryValue {
        match value {
            None => EntryValue::Tombstone,
            Some(value) => match self.options.value_log_threshold {
                Some(threshold)
                    if self.layout.log_kind() == LogKind::ValueLog && value.len() > threshold =>
                {
                    EntryValue::Pointer(ValueAddress::new(self.id, offset))
                }
                _ => EntryValue::Inline(value),
            },
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Log then insert a key-value pair
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.write(LogRecord::put(key, value))
    }

    /// Log then insert a tombstone
    pub fn delete(&self, key: Vec<u8>) -> Result<()> {
        self.write(LogRecord::delete(key))
    }

    fn write(&self, record: LogRecord) -> Result<()> {
        record.check_len()?;
        let mut log = self.log.lock();
        let writer = log.as_mut().ok_or_else(|| {
            StrataError::Storage(format!("memtable {} is sealed", self.id))
        })?;
        let offset = writer.append(&record)?;

        let value = self.entry_value(offset, record.value);
        self.list.write().put(record.key, value);
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// `Some(Tombstone)` means deleted here; `None` means not in this table
    pub fn get(&self, key: &[u8]) -> Option<EntryValue> {
        self.list.read().search(key)
    }

    /// Live keys in order
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.list.read().keys()
    }

    /// Entry count, tombstones included
    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.read().is_empty()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_sealed(&self) -> bool {
        self.log.lock().is_none()
    }

    pub fn check_invariants(&self) -> Result<()> {
        self.list.read().check_invariants()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop accepting writes and rename the log to its silence name.
    /// Sealing twice is a no-op.
    pub fn seal(&self) -> Result<()> {
        if let Some(writer) = self.log.lock().take() {
            writer.seal()?;
        }
        Ok(())
    }

    /// Write all entries to a new SSTable
    pub fn flush_to_table(&self, path: &Path) -> Result<TableSummary> {
        self.list.read().flush(path)
    }

    /// Drop the sealed log once its entries are in an SSTable
    pub fn retire_log(&self) -> Result<()> {
        wal::retire(&self.layout, self.id)
    }

    /// Drop the sealed log of a memtable that held nothing
    pub fn discard_log(&self) -> Result<()> {
        wal::discard(&self.layout, self.id)
    }
}
