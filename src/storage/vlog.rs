//! Value-log reads
//!
//! Resolves a `ValueAddress` stored in a memtable or SSTable to the value
//! bytes in its segment.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::entry::ValueAddress;
use crate::error::{Result, StrataError};
use crate::layout::{Layout, LogKind, LogState};
use crate::wal::decode_record;

/// Reads values out of value-log segments
#[derive(Debug, Clone)]
pub struct ValueLogReader {
    layout: Layout,
}

impl ValueLogReader {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Read the value stored at `address`
    pub fn read(&self, address: ValueAddress) -> Result<Vec<u8>> {
        let mut file = self.open_segment(address.segment_id)?;
        file.seek(SeekFrom::Start(address.offset))?;

        let mut size_bytes = [0u8; 4];
        file.read_exact(&mut size_bytes).map_err(|e| truncated(address, e))?;
        let total = u32::from_le_bytes(size_bytes) as usize;
        if total < size_bytes.len() {
            return Err(StrataError::Corruption(format!(
                "value-log record at {:?} has size {}",
                address, total
            )));
        }

        let mut record = vec![0u8; total];
        record[..4].copy_from_slice(&size_bytes);
        file.read_exact(&mut record[4..]).map_err(|e| truncated(address, e))?;

        match decode_record(&record, LogKind::ValueLog)? {
            Some((record, _)) => record.value.ok_or_else(|| {
                StrataError::Corruption(format!(
                    "value-log address {:?} points at a deletion",
                    address
                ))
            }),
            None => Err(StrataError::Corruption(format!(
                "value-log record at {:?} is incomplete",
                address
            ))),
        }
    }

    /// A segment moves active → silence → retired while it is being read
    /// from, so try each name in that order.
    fn open_segment(&self, segment_id: u64) -> Result<File> {
        for state in [LogState::Active, LogState::Silence, LogState::Retired] {
            match File::open(self.layout.log_path(segment_id, state)) {
                Ok(file) => return Ok(file),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(StrataError::Corruption(format!(
            "value-log segment {} not found",
            segment_id
        )))
    }
}

fn truncated(address: ValueAddress, err: std::io::Error) -> StrataError {
    if err.kind() == ErrorKind::UnexpectedEof {
        StrataError::Corruption(format!(
            "value-log record at {:?} runs past the end of its segment",
            address
        ))
    } else {
        StrataError::Io(err)
    }
}
