//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted run of records.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Record (repeated, ascending key order, no duplicate keys)        │
//! │   TotalSize: u32 | Deleted: u8 | StoreMode: u8 | KeyLen: u32     │
//! │   Key                                                            │
//! │   StoreMode = 0: ValueLen: u32 | Value                           │
//! │   StoreMode = 1: SegmentId: u64 | Offset: u64                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian. A tombstone is Deleted = 1,
//! StoreMode = 0, ValueLen = 0. There is no header or footer: a table is
//! read front to back and ends at a record boundary.

mod builder;
mod iterator;
mod reader;
pub mod record;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use builder::SSTableBuilder;
pub use iterator::SSTableIterator;
pub use reader::{scan_summary, SSTableReader};

// =============================================================================
// Write Summary
// =============================================================================

/// What a finished table contains, as observed while writing it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSummary {
    /// First key written
    pub min_key: Vec<u8>,
    /// Last key written
    pub max_key: Vec<u8>,
    /// Number of records written (tombstones included)
    pub entry_count: u64,
}

impl TableSummary {
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

// =============================================================================
// SSTable Metadata
// =============================================================================

/// Manifest record for one SSTable. Immutable once the table is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SSTableMeta {
    /// Monotonic id, also the numeric suffix of the file name
    pub id: u64,
    /// Level the table lives at
    pub level: u32,
    /// Path to the SSTable file
    pub file_path: PathBuf,
    /// Smallest key (for range filtering)
    pub min_key: Vec<u8>,
    /// Largest key (for range filtering)
    pub max_key: Vec<u8>,
    /// Number of records in this SSTable
    pub entry_count: u64,
    /// Unix millis when the table was registered
    pub create_time: u64,
}

impl SSTableMeta {
    pub fn new(id: u64, level: u32, file_path: impl Into<PathBuf>, summary: TableSummary) -> Self {
        let create_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            id,
            level,
            file_path: file_path.into(),
            min_key: summary.min_key,
            max_key: summary.max_key,
            entry_count: summary.entry_count,
            create_time,
        }
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false if key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        key >= self.min_key.as_slice() && key <= self.max_key.as_slice()
    }

    /// Closed-interval intersection of the two key ranges
    pub fn overlaps(&self, other: &SSTableMeta) -> bool {
        self.max_key >= other.min_key && other.max_key >= self.min_key
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Remove the backing file. A file that is already gone is not an error.
    pub fn delete_file(&self) -> Result<()> {
        match fs::remove_file(&self.file_path) {
            Ok(()) => {
                tracing::debug!(id = self.id, path = %self.file_path.display(), "Deleted SSTable file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
