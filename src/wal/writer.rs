//! Log Writer
//!
//! Appends records to the active log file and moves the file through its
//! lifecycle: active → silence → deleted (WAL) or retired (value-log).

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;

use crate::config::WalSyncStrategy;
use crate::error::{Result, StrataError};
use crate::layout::{Layout, LogKind, LogState};

use super::LogRecord;

/// Writes records to one active log file
pub struct LogWriter {
    id: u64,
    layout: Layout,
    path: PathBuf,
    writer: BufWriter<File>,
    sync_strategy: WalSyncStrategy,
    /// Offset the next record will be written at
    offset: u64,
    /// Appends since the last fsync
    unsynced: usize,
    buf: BytesMut,
}

impl LogWriter {
    /// Create a new, empty active log
    pub fn create(layout: &Layout, id: u64, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let path = layout.log_path(id, LogState::Active);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        tracing::debug!(id, path = %path.display(), "Created log");
        Ok(Self::from_file(layout, id, path, file, 0, sync_strategy))
    }

    /// Reopen a recovered active log for appending.
    ///
    /// Anything past `valid_len` (a partially written record) is cut off.
    pub fn reopen(
        layout: &Layout,
        id: u64,
        valid_len: u64,
        sync_strategy: WalSyncStrategy,
    ) -> Result<Self> {
        let path = layout.log_path(id, LogState::Active);
        let mut file = OpenOptions::new().write(true).open(&path)?;

        if file.metadata()?.len() > valid_len {
            tracing::warn!(id, valid_len, "Truncating partial record at end of log");
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        file.seek(SeekFrom::Start(valid_len))?;

        Ok(Self::from_file(layout, id, path, file, valid_len, sync_strategy))
    }

    fn from_file(
        layout: &Layout,
        id: u64,
        path: PathBuf,
        file: File,
        offset: u64,
        sync_strategy: WalSyncStrategy,
    ) -> Self {
        Self {
            id,
            layout: layout.clone(),
            path,
            writer: BufWriter::new(file),
            sync_strategy,
            offset,
            unsynced: 0,
            buf: BytesMut::with_capacity(256),
        }
    }

    /// Append a record, returning the offset it was written at.
    ///
    /// The record is flushed to the OS before returning; fsync follows the
    /// configured strategy.
    pub fn append(&mut self, record: &LogRecord) -> Result<u64> {
        let offset = self.offset;

        self.buf.clear();
        record.encode(self.layout.log_kind(), &mut self.buf);
        self.writer.write_all(&self.buf)?;
        self.writer.flush()?;

        self.offset += self.buf.len() as u64;
        self.unsynced += 1;

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if should_sync {
            self.sync()?;
        }

        Ok(offset)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Flush, fsync, close and rename the file to its silence name.
    pub fn seal(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| StrataError::Storage(format!("Failed to flush log: {}", e)))?;
        file.sync_all()?;
        drop(file);

        let silence = self.layout.log_path(self.id, LogState::Silence);
        fs::rename(&self.path, &silence)?;
        tracing::debug!(id = self.id, path = %silence.display(), "Sealed log");
        Ok(silence)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far
    pub fn len(&self) -> u64 {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }
}

/// Finish a sealed log whose data is now in an SSTable.
///
/// A WAL is deleted. A value-log segment is renamed to its retired name and
/// kept, since SSTable pointers still reference it.
pub fn retire(layout: &Layout, id: u64) -> Result<()> {
    let silence = layout.log_path(id, LogState::Silence);
    match layout.log_kind() {
        LogKind::Wal => remove_if_exists(&silence),
        LogKind::ValueLog => {
            let retired = layout.log_path(id, LogState::Retired);
            fs::rename(&silence, &retired)?;
            tracing::debug!(id, path = %retired.display(), "Retired value-log segment");
            Ok(())
        }
    }
}

/// Remove a sealed log that never produced an SSTable
pub fn discard(layout: &Layout, id: u64) -> Result<()> {
    remove_if_exists(&layout.log_path(id, LogState::Silence))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Deleted log");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
