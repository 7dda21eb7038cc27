//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Route writes through the current MemTable (log first, then skip list)
//! - Rotate full MemTables and hand them to the background flush
//! - Answer reads from MemTables, then the Manifest
//! - Manage crash recovery on startup

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::background::{Task, TaskQueue};
use crate::config::Config;
use crate::entry::EntryValue;
use crate::error::{Result, StrataError};
use crate::ids::IdAllocator;
use crate::layout::{Layout, LogKind};
use crate::memtable::{MemTable, MemTableOptions};
use crate::storage::{Manifest, SSTableMeta, ValueLogReader};
use crate::wal::LogRecovery;

/// Point-in-time counters, for monitoring and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Entries in the current MemTable, tombstones included
    pub memtable_entries: usize,
    /// Rotated MemTables still waiting for their flush
    pub immutable_memtables: usize,
    pub tables_per_level: Vec<usize>,
    pub compactions_per_level: Vec<u64>,
}

/// State shared between the foreground API and background flushes
struct Shared {
    layout: Layout,
    ids: Arc<IdAllocator>,
    manifest: Manifest,
    /// Rotated MemTables, oldest first. Still served to readers until
    /// their table is registered.
    immutables: RwLock<Vec<Arc<MemTable>>>,
    vlog: Option<ValueLogReader>,
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete/flush/close): Serialized by `write_lock`
///   - Only ONE write operation at a time
///   - Order: write_lock → log append → skip list → (rotate)
///
/// - **Reads** (get): No write_lock needed
///   - MemTables use an internal RwLock (many concurrent readers)
///   - Levels hold a read lock while their files are scanned
///
/// - **Flushes and compactions**: one background worker thread
pub struct Engine {
    /// Engine configuration
    config: Config,

    shared: Arc<Shared>,

    /// MemTable receiving writes
    current: RwLock<Arc<MemTable>>,

    memtable_options: MemTableOptions,

    queue: TaskQueue,

    /// Serializes write operations (put/delete/flush)
    write_lock: Mutex<()>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create directories, seed ids past every file on disk
    /// 2. Open the manifest (snapshot or directory listing)
    /// 3. Replay sealed logs into immutable MemTables and queue their flush
    /// 4. Replay the active log into the current MemTable, or start fresh
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let log_kind = match config.value_log_threshold {
            Some(_) => LogKind::ValueLog,
            None => LogKind::Wal,
        };
        let layout = Layout::new(&config.data_dir, log_kind);
        layout.create_dirs()?;

        let ids = Arc::new(IdAllocator::recover(&layout)?);
        let manifest = Manifest::open(layout.clone(), &config, ids.clone())?;
        let memtable_options = MemTableOptions::from_config(&config);

        let logs = LogRecovery::discover(&layout)?;

        let mut immutables = Vec::with_capacity(logs.silence.len());
        for id in &logs.silence {
            let (memtable, result) =
                MemTable::recover_sealed(&layout, *id, memtable_options.clone())?;
            tracing::info!(
                log_id = id,
                entries = result.entries_recovered,
                "Recovered sealed memtable"
            );
            immutables.push(Arc::new(memtable));
        }

        let current = match logs.active {
            Some(id) => {
                let (memtable, result) =
                    MemTable::recover_active(&layout, id, memtable_options.clone())?;
                tracing::info!(
                    log_id = id,
                    entries = result.entries_recovered,
                    truncated = result.was_truncated,
                    "Recovered active memtable"
                );
                memtable
            }
            None => MemTable::create(&layout, ids.next_log_id(), memtable_options.clone())?,
        };

        let vlog = match log_kind {
            LogKind::ValueLog => Some(ValueLogReader::new(layout.clone())),
            LogKind::Wal => None,
        };

        let shared = Arc::new(Shared {
            layout,
            ids,
            manifest,
            immutables: RwLock::new(immutables.clone()),
            vlog,
        });

        let queue = TaskQueue::start("stratakv-flush")?;
        for memtable in immutables {
            queue.submit(Box::new(FlushTask {
                memtable,
                shared: shared.clone(),
            }))?;
        }

        tracing::info!(data_dir = %config.data_dir.display(), ?log_kind, "Engine opened");

        Ok(Self {
            config,
            shared,
            current: RwLock::new(Arc::new(current)),
            memtable_options,
            queue,
            write_lock: Mutex::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a value by key
    ///
    /// Search order:
    /// 1. Current MemTable (most recent writes)
    /// 2. Immutable MemTables (newest to oldest)
    /// 3. Manifest levels
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let current = self.current.read().clone();
        if let Some(value) = current.get(key) {
            return self.resolve(value);
        }

        let immutables = self.shared.immutables.read().clone();
        for memtable in immutables.iter().rev() {
            if let Some(value) = memtable.get(key) {
                return self.resolve(value);
            }
        }

        match self.shared.manifest.get(key)? {
            Some(value) => self.resolve(value),
            None => Ok(None),
        }
    }

    fn resolve(&self, value: EntryValue) -> Result<Option<Vec<u8>>> {
        match value {
            EntryValue::Inline(bytes) => Ok(Some(bytes)),
            EntryValue::Tombstone => Ok(None),
            EntryValue::Pointer(address) => match &self.shared.vlog {
                Some(vlog) => vlog.read(address).map(Some),
                None => Err(StrataError::Corruption(format!(
                    "value-log address {:?} found without a value log",
                    address
                ))),
            },
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Put a key-value pair
    ///
    /// The log append is complete before the MemTable changes. A MemTable
    /// that grows past the entry limit is rotated out.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        let current = self.writable_current()?;
        current.put(key.to_vec(), value.to_vec())?;
        self.maybe_rotate(&current)
    }

    /// Delete a key (writes a tombstone)
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        let current = self.writable_current()?;
        current.delete(key.to_vec())?;
        self.maybe_rotate(&current)
    }

    /// The current MemTable, unless a failed rotation left it sealed
    fn writable_current(&self) -> Result<Arc<MemTable>> {
        let current = self.current.read().clone();
        if current.is_sealed() {
            self.queue.health()?;
            return Err(StrataError::Storage(format!(
                "memtable {} is sealed",
                current.id()
            )));
        }
        Ok(current)
    }

    fn maybe_rotate(&self, current: &MemTable) -> Result<()> {
        if current.len() > self.config.memtable_entry_limit {
            self.rotate()?;
        }
        Ok(())
    }

    /// Rotate the current MemTable out so it gets flushed
    ///
    /// Forces a flush regardless of MemTable size; an empty one is left alone.
    pub fn flush(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        if self.writable_current()?.is_empty() {
            return Ok(());
        }
        self.rotate()
    }

    /// Seal the current MemTable, install a fresh one, queue the flush.
    /// Caller holds `write_lock`.
    ///
    /// A failure here leaves the sealed MemTable in place; it is recorded so
    /// later writes and `health` report it.
    fn rotate(&self) -> Result<()> {
        let old = self.current.read().clone();
        let new = old.seal().and_then(|()| {
            MemTable::create(
                &self.shared.layout,
                self.shared.ids.next_log_id(),
                self.memtable_options.clone(),
            )
        });
        let new = match new {
            Ok(new) => new,
            Err(e) => {
                self.queue
                    .record_failure(format!("rotating memtable {} failed: {}", old.id(), e));
                return Err(e);
            }
        };

        // Visible as immutable before it stops being current
        if !old.is_empty() {
            self.shared.immutables.write().push(old.clone());
        }
        *self.current.write() = Arc::new(new);
        self.hand_off(old)
    }

    /// Queue the flush of a sealed MemTable, or drop its log if it is empty.
    /// A non-empty one must already be in `immutables`.
    fn hand_off(&self, sealed: Arc<MemTable>) -> Result<()> {
        if sealed.is_empty() {
            return sealed.discard_log();
        }
        tracing::debug!(log_id = sealed.id(), entries = sealed.len(), "Rotated memtable");
        self.queue.submit(Box::new(FlushTask {
            memtable: sealed,
            shared: self.shared.clone(),
        }))
    }

    // =========================================================================
    // Background Coordination
    // =========================================================================

    /// Block until every flush queued so far (and its compactions) is done
    pub fn sync_background(&self) -> Result<()> {
        self.queue.wait_idle()
    }

    /// The background failure, if a flush or compaction has failed
    pub fn health(&self) -> Result<()> {
        self.queue.health()
    }

    pub fn stats(&self) -> EngineStats {
        let manifest = self.shared.manifest.stats();
        EngineStats {
            memtable_entries: self.current.read().len(),
            immutable_memtables: self.shared.immutables.read().len(),
            tables_per_level: manifest.tables_per_level,
            compactions_per_level: manifest.compactions_per_level,
        }
    }

    /// Close the engine gracefully
    ///
    /// Seals the current MemTable and queues its flush, runs every queued
    /// flush and stops the worker. Leaves no active log behind. A background
    /// failure is reported here.
    pub fn close(mut self) -> Result<()> {
        {
            let _write_guard = self.write_lock.lock();
            // No replacement MemTable: nothing is written after this
            let last = self.current.read().clone();
            last.seal()?;
            if !last.is_empty() {
                self.shared.immutables.write().push(last.clone());
            }
            self.hand_off(last)?;
        }
        self.queue.shutdown()?;
        tracing::info!(data_dir = %self.config.data_dir.display(), "Engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tables at one level, oldest first
    pub fn level_tables(&self, level: u32) -> Vec<SSTableMeta> {
        self.shared.manifest.level_tables(level)
    }
}

// =============================================================================
// Flush Task
// =============================================================================

/// Writes one immutable MemTable to level 0 and retires its log
struct FlushTask {
    memtable: Arc<MemTable>,
    shared: Arc<Shared>,
}

impl Task for FlushTask {
    fn name(&self) -> &'static str {
        "flush"
    }

    fn run(self: Box<Self>) -> Result<()> {
        let FlushTask { memtable, shared } = *self;

        if !memtable.is_empty() {
            let id = shared.ids.next_table_id();
            let path = shared.layout.table_path(id);
            let summary = memtable.flush_to_table(&path)?;
            tracing::info!(
                table_id = id,
                log_id = memtable.id(),
                entries = summary.entry_count,
                "Flushed memtable"
            );
            shared
                .manifest
                .add_table(SSTableMeta::new(id, 0, path, summary))?;
        }

        shared
            .immutables
            .write()
            .retain(|m| !Arc::ptr_eq(m, &memtable));

        if memtable.is_empty() {
            memtable.discard_log()
        } else {
            memtable.retire_log()
        }
    }
}
