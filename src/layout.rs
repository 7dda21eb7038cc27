//! Directory layout and file naming
//!
//! ```text
//! inline WAL mode                 value-log mode
//! {data_dir}/                     {data_dir}/
//!   ├── MANIFEST                    ├── MANIFEST
//!   ├── sstable_<id>.sst            ├── key/<id>.sst
//!   ├── wal_active_<id>.wal         └── value/
//!   └── wal_silence_<id>.wal              ├── v_active_<id>.wal
//!                                         ├── v_silence_<id>.wal
//!                                         └── v_<id>.vlog
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Which durability log backs the memtables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Inline write-ahead log, deleted once flushed
    Wal,
    /// Value-log segments, retired (kept) once flushed
    ValueLog,
}

/// Lifecycle state encoded in a log file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    /// Receiving writes
    Active,
    /// Rotated out, waiting for its flush
    Silence,
    /// Flushed; kept only because SSTables reference it
    Retired,
}

/// Path builder for every file the engine owns
#[derive(Debug, Clone)]
pub struct Layout {
    data_dir: PathBuf,
    log_kind: LogKind,
}

impl Layout {
    const MANIFEST_FILENAME: &'static str = "MANIFEST";
    const KEY_DIR: &'static str = "key";
    const VALUE_DIR: &'static str = "value";

    pub fn new(data_dir: impl Into<PathBuf>, log_kind: LogKind) -> Self {
        Self {
            data_dir: data_dir.into(),
            log_kind,
        }
    }

    /// Create every directory this layout writes into
    pub fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(self.table_dir())?;
        fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_kind(&self) -> LogKind {
        self.log_kind
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir.join(Self::MANIFEST_FILENAME)
    }

    // =========================================================================
    // SSTables
    // =========================================================================

    pub fn table_dir(&self) -> PathBuf {
        match self.log_kind {
            LogKind::Wal => self.data_dir.clone(),
            LogKind::ValueLog => self.data_dir.join(Self::KEY_DIR),
        }
    }

    pub fn table_path(&self, id: u64) -> PathBuf {
        let name = match self.log_kind {
            LogKind::Wal => format!("sstable_{}.sst", id),
            LogKind::ValueLog => format!("{}.sst", id),
        };
        self.table_dir().join(name)
    }

    /// "sstable_42.sst" → Some(42) (or "42.sst" in value-log mode)
    pub fn parse_table_id(&self, path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let id_str = match self.log_kind {
            LogKind::Wal => stem.strip_prefix("sstable_")?,
            LogKind::ValueLog => stem,
        };
        id_str.parse().ok()
    }

    // =========================================================================
    // Logs
    // =========================================================================

    pub fn log_dir(&self) -> PathBuf {
        match self.log_kind {
            LogKind::Wal => self.data_dir.clone(),
            LogKind::ValueLog => self.data_dir.join(Self::VALUE_DIR),
        }
    }

    pub fn log_path(&self, id: u64, state: LogState) -> PathBuf {
        let name = match (self.log_kind, state) {
            (LogKind::Wal, LogState::Active) => format!("wal_active_{}.wal", id),
            (LogKind::Wal, LogState::Silence) => format!("wal_silence_{}.wal", id),
            // Inline WAL files are deleted rather than retired
            (LogKind::Wal, LogState::Retired) => format!("wal_retired_{}.wal", id),
            (LogKind::ValueLog, LogState::Active) => format!("v_active_{}.wal", id),
            (LogKind::ValueLog, LogState::Silence) => format!("v_silence_{}.wal", id),
            (LogKind::ValueLog, LogState::Retired) => format!("v_{}.vlog", id),
        };
        self.log_dir().join(name)
    }

    /// Parse a log file name into its state and id
    pub fn parse_log_name(&self, path: &Path) -> Option<(LogState, u64)> {
        let name = path.file_name()?.to_str()?;
        let (state, id_str) = match self.log_kind {
            LogKind::Wal => {
                let stem = name.strip_suffix(".wal")?;
                if let Some(id) = stem.strip_prefix("wal_active_") {
                    (LogState::Active, id)
                } else if let Some(id) = stem.strip_prefix("wal_silence_") {
                    (LogState::Silence, id)
                } else {
                    return None;
                }
            }
            LogKind::ValueLog => {
                if let Some(stem) = name.strip_suffix(".vlog") {
                    (LogState::Retired, stem.strip_prefix("v_")?)
                } else {
                    let stem = name.strip_suffix(".wal")?;
                    if let Some(id) = stem.strip_prefix("v_active_") {
                        (LogState::Active, id)
                    } else if let Some(id) = stem.strip_prefix("v_silence_") {
                        (LogState::Silence, id)
                    } else {
                        return None;
                    }
                }
            }
        };
        id_str.parse().ok().map(|id| (state, id))
    }
}
