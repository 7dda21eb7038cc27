//! SSTable Reader
//!
//! Point lookups by scanning the table front to back.

use std::path::{Path, PathBuf};

use crate::entry::EntryValue;
use crate::error::{Result, StrataError};

use super::iterator::SSTableIterator;
use super::TableSummary;

/// Reader for one SSTable file
pub struct SSTableReader {
    path: PathBuf,
}

impl SSTableReader {
    /// Open an SSTable for reading. Fails if the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(StrataError::Corruption(format!(
                "SSTable file missing: {}",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Find the record for `key`.
    ///
    /// Returns:
    /// - `Ok(Some(EntryValue::Tombstone))`: key deleted in this table
    /// - `Ok(Some(value))`: key found
    /// - `Ok(None)`: key not in this table
    pub fn get(&self, key: &[u8]) -> Result<Option<EntryValue>> {
        for entry in self.iter()? {
            let entry = entry?;
            if entry.key.as_slice() == key {
                return Ok(Some(entry.value));
            }
            // Sorted: nothing after this can match
            if entry.key.as_slice() > key {
                break;
            }
        }
        Ok(None)
    }

    /// Create an iterator over all entries (for compaction, debugging)
    pub fn iter(&self) -> Result<SSTableIterator> {
        SSTableIterator::open(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Rebuild the summary of an existing table by reading every record.
///
/// Used when tables must be registered without a manifest snapshot. Keys
/// that are not strictly ascending are corruption.
pub fn scan_summary(path: &Path) -> Result<TableSummary> {
    let mut summary = TableSummary::default();
    for entry in SSTableIterator::open(path)? {
        let entry = entry?;
        if summary.entry_count == 0 {
            summary.min_key = entry.key.clone();
        } else if entry.key <= summary.max_key {
            return Err(StrataError::Corruption(format!(
                "SSTable {} is not sorted",
                path.display()
            )));
        }
        summary.max_key = entry.key;
        summary.entry_count += 1;
    }
    Ok(summary)
}
