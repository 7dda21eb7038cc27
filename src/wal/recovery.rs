//! Log Recovery
//!
//! Finds the logs left behind by a previous run and replays them.

use std::fs;
use std::path::Path;

use crate::error::{Result, StrataError};
use crate::layout::{Layout, LogKind, LogState};

use super::{LogReader, LogRecord};

/// Logs that still hold data not yet in an SSTable
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LogFiles {
    /// The log that was receiving writes, if any
    pub active: Option<u64>,
    /// Sealed logs whose flush never completed, oldest first
    pub silence: Vec<u64>,
}

/// Result of a recovery operation
#[derive(Debug, Default)]
pub struct RecoveryResult {
    /// Number of records successfully recovered
    pub entries_recovered: u64,

    /// Length of the file prefix made of complete records
    pub valid_len: u64,

    /// Whether a partially written record was found at the end
    pub was_truncated: bool,
}

/// Handles log recovery after crash
pub struct LogRecovery;

impl LogRecovery {
    /// List recoverable logs in the layout's log directory
    pub fn discover(layout: &Layout) -> Result<LogFiles> {
        let mut files = LogFiles::default();

        for entry in fs::read_dir(layout.log_dir())? {
            let path = entry?.path();
            match layout.parse_log_name(&path) {
                Some((LogState::Active, id)) => {
                    if let Some(existing) = files.active {
                        return Err(StrataError::Corruption(format!(
                            "found two active logs: {} and {}",
                            existing, id
                        )));
                    }
                    files.active = Some(id);
                }
                Some((LogState::Silence, id)) => files.silence.push(id),
                Some((LogState::Retired, _)) | None => {}
            }
        }

        files.silence.sort_unstable();
        tracing::debug!(active = ?files.active, silence = ?files.silence, "Discovered logs");
        Ok(files)
    }

    /// Recover records from a log file
    ///
    /// This will:
    /// 1. Read all complete records in order
    /// 2. Stop at a partially written tail and report it
    /// 3. Fail on a malformed record
    pub fn recover(path: &Path, kind: LogKind) -> Result<(Vec<(u64, LogRecord)>, RecoveryResult)> {
        let mut reader = LogReader::open(path, kind)?;
        let mut records = Vec::new();
        while let Some(record) = reader.next_record()? {
            records.push(record);
        }

        let result = RecoveryResult {
            entries_recovered: records.len() as u64,
            valid_len: reader.valid_len(),
            was_truncated: reader.was_truncated(),
        };

        if result.was_truncated {
            tracing::warn!(
                path = %path.display(),
                valid_len = result.valid_len,
                "Log ends with a partial record"
            );
        }
        tracing::info!(
            path = %path.display(),
            entries = result.entries_recovered,
            "Replayed log"
        );

        Ok((records, result))
    }

    /// Verify integrity of a log file without modifying it
    pub fn verify(path: &Path, kind: LogKind) -> Result<RecoveryResult> {
        let mut reader = LogReader::open(path, kind)?;
        let mut entries_recovered = 0;
        while reader.next_record()?.is_some() {
            entries_recovered += 1;
        }
        Ok(RecoveryResult {
            entries_recovered,
            valid_len: reader.valid_len(),
            was_truncated: reader.was_truncated(),
        })
    }
}
