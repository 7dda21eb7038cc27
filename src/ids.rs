//! Id assignment for SSTables and log segments
//!
//! Ids are the numeric suffixes of file names. On startup the allocator is
//! seeded past the largest id found on disk so new files never collide with
//! recovered ones.

use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::layout::Layout;

/// Hands out monotonically increasing table and log ids
#[derive(Debug)]
pub struct IdAllocator {
    next_table_id: AtomicU64,
    next_log_id: AtomicU64,
}

impl IdAllocator {
    /// Start both counters at 1
    pub fn new() -> Self {
        Self::starting_at(1, 1)
    }

    pub fn starting_at(next_table_id: u64, next_log_id: u64) -> Self {
        Self {
            next_table_id: AtomicU64::new(next_table_id),
            next_log_id: AtomicU64::new(next_log_id),
        }
    }

    /// Seed the counters from the files already present in the layout
    pub fn recover(layout: &Layout) -> Result<Self> {
        let mut max_table = 0;
        for entry in fs::read_dir(layout.table_dir())? {
            let path = entry?.path();
            if let Some(id) = layout.parse_table_id(&path) {
                max_table = max_table.max(id);
            }
        }

        let mut max_log = 0;
        for entry in fs::read_dir(layout.log_dir())? {
            let path = entry?.path();
            if let Some((_, id)) = layout.parse_log_name(&path) {
                max_log = max_log.max(id);
            }
        }

        tracing::debug!(max_table, max_log, "Seeded id allocator from data directory");
        Ok(Self::starting_at(max_table + 1, max_log + 1))
    }

    pub fn next_table_id(&self) -> u64 {
        self.next_table_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn next_log_id(&self) -> u64 {
        self.next_log_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Make sure future table ids are greater than `id`
    pub fn observe_table_id(&self, id: u64) {
        self.next_table_id.fetch_max(id + 1, Ordering::SeqCst);
    }

    /// Peek at the next table id (for testing/debugging)
    pub fn peek_table_id(&self) -> u64 {
        self.next_table_id.load(Ordering::SeqCst)
    }

    /// Peek at the next log id (for testing/debugging)
    pub fn peek_log_id(&self) -> u64 {
        self.next_log_id.load(Ordering::SeqCst)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
