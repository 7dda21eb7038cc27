//! SSTable Builder
//!
//! Writes sorted entries to a new SSTable file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;

use crate::entry::Entry;
use crate::error::{Result, StrataError};

use super::record::encode_entry;
use super::TableSummary;

/// Builder for creating new SSTables from sorted entries
pub struct SSTableBuilder {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Scratch buffer reused for every record
    buf: BytesMut,
    /// Number of entries written
    entry_count: u64,
    /// Track min/max keys for metadata
    min_key: Option<Vec<u8>>,
    max_key: Option<Vec<u8>>,
}

impl SSTableBuilder {
    /// Create (or truncate) the output file
    ///
    /// Call `add()` in strictly ascending key order, then `finish()`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            buf: BytesMut::with_capacity(256),
            entry_count: 0,
            min_key: None,
            max_key: None,
        })
    }

    /// Append one record
    pub fn add(&mut self, entry: &Entry) -> Result<()> {
        if let Some(last) = &self.max_key {
            if entry.key.as_slice() <= last.as_slice() {
                return Err(StrataError::Storage(format!(
                    "SSTable {} keys out of order: {:?} after {:?}",
                    self.path.display(),
                    entry.key,
                    last
                )));
            }
        }

        self.buf.clear();
        encode_entry(entry, &mut self.buf);
        self.writer.write_all(&self.buf)?;

        if self.min_key.is_none() {
            self.min_key = Some(entry.key.clone());
        }
        self.max_key = Some(entry.key.clone());
        self.entry_count += 1;

        Ok(())
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and fsync, returning what was written
    pub fn finish(mut self) -> Result<TableSummary> {
        self.writer.flush()?;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| StrataError::Storage(format!("Failed to flush SSTable: {}", e)))?;
        file.sync_all()?;

        tracing::debug!(
            path = %self.path.display(),
            entries = self.entry_count,
            "Finished SSTable"
        );

        Ok(TableSummary {
            min_key: self.min_key.unwrap_or_default(),
            max_key: self.max_key.unwrap_or_default(),
            entry_count: self.entry_count,
        })
    }
}
