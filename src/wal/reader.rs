//! Log Reader
//!
//! Replays the records of one log file in write order.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::layout::LogKind;

use super::record::{decode_record, LogRecord};

/// Iterates `(offset, record)` pairs of a log file
///
/// The file is read into memory once. Iteration stops at the first record
/// that runs past the end of the file; `was_truncated` then reports it.
pub struct LogReader {
    data: Vec<u8>,
    kind: LogKind,
    position: usize,
    truncated: bool,
    done: bool,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open(path: &Path, kind: LogKind) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(Self::from_bytes(data, kind))
    }

    pub fn from_bytes(data: Vec<u8>, kind: LogKind) -> Self {
        Self {
            data,
            kind,
            position: 0,
            truncated: false,
            done: false,
        }
    }

    /// Read the next record from the log
    pub fn next_record(&mut self) -> Result<Option<(u64, LogRecord)>> {
        if self.done || self.position >= self.data.len() {
            self.done = true;
            return Ok(None);
        }

        let offset = self.position;
        match decode_record(&self.data[offset..], self.kind) {
            Ok(Some((record, len))) => {
                self.position += len;
                Ok(Some((offset as u64, record)))
            }
            Ok(None) => {
                self.truncated = true;
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    /// Length of the prefix holding complete records read so far
    pub fn valid_len(&self) -> u64 {
        self.position as u64
    }

    pub fn was_truncated(&self) -> bool {
        self.truncated
    }
}

impl Iterator for LogReader {
    type Item = Result<(u64, LogRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
