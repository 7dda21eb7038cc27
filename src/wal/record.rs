//! Log record encoding
//!
//! One `LogRecord` is one accepted write. The byte layout depends on the
//! `LogKind` of the file it lives in.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, StrataError};
use crate::layout::LogKind;

/// Framing bytes added around key and value by the largest encoding (an
/// SSTable record with an inline value), rounded up
const RECORD_OVERHEAD: u64 = 32;

/// Largest `key.len() + value.len()` whose records fit the u32 length fields
pub const MAX_ENTRY_LEN: u64 = u32::MAX as u64 - RECORD_OVERHEAD;

/// Reject a write whose encoded records would overflow a u32 length field
pub fn check_entry_len(key_len: usize, value_len: usize) -> Result<()> {
    let len = key_len as u64 + value_len as u64;
    if len > MAX_ENTRY_LEN {
        return Err(StrataError::EntryTooLarge {
            len,
            max: MAX_ENTRY_LEN,
        });
    }
    Ok(())
}

/// A single write in a durability log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub key: Vec<u8>,
    /// `None` marks a deletion
    pub value: Option<Vec<u8>>,
}

impl LogRecord {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }

    /// See `check_entry_len`
    pub fn check_len(&self) -> Result<()> {
        check_entry_len(self.key.len(), self.value.as_ref().map_or(0, Vec::len))
    }

    /// Size of the encoded record in bytes
    pub fn encoded_len(&self, kind: LogKind) -> usize {
        let value_len = self.value.as_ref().map_or(0, |v| v.len());
        match kind {
            // deleted + key_len + key + value_len + value
            LogKind::Wal => 1 + 4 + self.key.len() + 4 + value_len,
            LogKind::ValueLog => {
                let tail = if self.value.is_some() { 4 + value_len } else { 0 };
                4 + 1 + 4 + self.key.len() + tail
            }
        }
    }

    /// Append the encoded record to `buf`
    pub fn encode(&self, kind: LogKind, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len(kind));
        let deleted = u8::from(self.is_delete());

        match kind {
            LogKind::Wal => {
                buf.put_u8(deleted);
                buf.put_u32_le(self.key.len() as u32);
                buf.put_slice(&self.key);
                let value = self.value.as_deref().unwrap_or_default();
                buf.put_u32_le(value.len() as u32);
                buf.put_slice(value);
            }
            LogKind::ValueLog => {
                buf.put_u32_le(self.encoded_len(kind) as u32);
                buf.put_u8(deleted);
                buf.put_u32_le(self.key.len() as u32);
                buf.put_slice(&self.key);
                if let Some(value) = &self.value {
                    buf.put_u32_le(value.len() as u32);
                    buf.put_slice(value);
                }
            }
        }
    }
}

/// Decode the record at the front of `buf`.
///
/// Returns the record and its encoded length, or `Ok(None)` when `buf` ends
/// before the record does (a partially written tail).
pub fn decode_record(buf: &[u8], kind: LogKind) -> Result<Option<(LogRecord, usize)>> {
    match kind {
        LogKind::Wal => decode_wal(buf),
        LogKind::ValueLog => decode_vlog(buf),
    }
}

fn decode_wal(mut buf: &[u8]) -> Result<Option<(LogRecord, usize)>> {
    let start = buf.remaining();
    if buf.remaining() < 5 {
        return Ok(None);
    }
    let deleted = parse_flag(buf.get_u8())?;
    let key_len = buf.get_u32_le() as usize;
    if buf.remaining() < key_len + 4 {
        return Ok(None);
    }
    let key = buf[..key_len].to_vec();
    buf.advance(key_len);

    let value_len = buf.get_u32_le() as usize;
    if deleted && value_len != 0 {
        return Err(StrataError::WalCorruption(format!(
            "deletion record carries a {} byte value",
            value_len
        )));
    }
    if buf.remaining() < value_len {
        return Ok(None);
    }
    let value = if deleted {
        None
    } else {
        Some(buf[..value_len].to_vec())
    };
    buf.advance(value_len);

    Ok(Some((LogRecord { key, value }, start - buf.remaining())))
}

fn decode_vlog(buf: &[u8]) -> Result<Option<(LogRecord, usize)>> {
    if buf.len() < 4 {
        return Ok(None);
    }
    let mut header = buf;
    let total = header.get_u32_le() as usize;
    // total_size + deleted + key_len
    if total < 9 {
        return Err(StrataError::WalCorruption(format!(
            "value-log record size {} is below the minimum",
            total
        )));
    }
    if buf.len() < total {
        return Ok(None);
    }

    let mut body = &buf[4..total];
    let deleted = parse_flag(body.get_u8())?;
    let key_len = body.get_u32_le() as usize;
    if body.remaining() < key_len {
        return Err(inconsistent_size(total));
    }
    let key = body[..key_len].to_vec();
    body.advance(key_len);

    let value = if deleted {
        None
    } else {
        if body.remaining() < 4 {
            return Err(inconsistent_size(total));
        }
        let value_len = body.get_u32_le() as usize;
        if body.remaining() < value_len {
            return Err(inconsistent_size(total));
        }
        let value = body[..value_len].to_vec();
        body.advance(value_len);
        Some(value)
    };

    if body.has_remaining() {
        return Err(inconsistent_size(total));
    }

    Ok(Some((LogRecord { key, value }, total)))
}

fn parse_flag(flag: u8) -> Result<bool> {
    match flag {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StrataError::WalCorruption(format!(
            "invalid deleted flag {}",
            other
        ))),
    }
}

fn inconsistent_size(total: usize) -> StrataError {
    StrataError::WalCorruption(format!(
        "value-log record fields do not add up to total size {}",
        total
    ))
}
