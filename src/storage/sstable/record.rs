//! SSTable record codec
//!
//! Encoding and decoding of a single table record. Every field is
//! fixed-width or explicitly length-prefixed, so a reader can stream records
//! forward without backtracking.

use std::io::{ErrorKind, Read};

use bytes::{Buf, BufMut, BytesMut};

use crate::entry::{Entry, EntryValue, ValueAddress};
use crate::error::{Result, StrataError};

/// Value bytes follow the key
pub const STORE_INLINE: u8 = 0;

/// A value-log address follows the key
pub const STORE_POINTER: u8 = 1;

/// TotalSize (4) + Deleted (1) + StoreMode (1) + KeyLen (4)
pub const RECORD_PREFIX: usize = 10;

/// Number of bytes `encode_entry` produces for this entry
pub fn encoded_len(entry: &Entry) -> usize {
    let tail = match &entry.value {
        EntryValue::Inline(value) => 4 + value.len(),
        EntryValue::Pointer(_) => ValueAddress::ENCODED_LEN,
        EntryValue::Tombstone => 4,
    };
    RECORD_PREFIX + entry.key.len() + tail
}

/// Append the encoded record to `buf`
pub fn encode_entry(entry: &Entry, buf: &mut BytesMut) {
    let total = encoded_len(entry);
    buf.reserve(total);

    buf.put_u32_le(total as u32);
    match &entry.value {
        EntryValue::Inline(value) => {
            buf.put_u8(0);
            buf.put_u8(STORE_INLINE);
            put_key(buf, &entry.key);
            buf.put_u32_le(value.len() as u32);
            buf.put_slice(value);
        }
        EntryValue::Pointer(address) => {
            buf.put_u8(0);
            buf.put_u8(STORE_POINTER);
            put_key(buf, &entry.key);
            buf.put_u64_le(address.segment_id);
            buf.put_u64_le(address.offset);
        }
        EntryValue::Tombstone => {
            buf.put_u8(1);
            buf.put_u8(STORE_INLINE);
            put_key(buf, &entry.key);
            buf.put_u32_le(0);
        }
    }
}

fn put_key(buf: &mut BytesMut, key: &[u8]) {
    buf.put_u32_le(key.len() as u32);
    buf.put_slice(key);
}

/// Decode one full record (including its TotalSize prefix)
pub fn decode_entry(bytes: &[u8]) -> Result<Entry> {
    if bytes.len() < RECORD_PREFIX {
        return Err(corrupt("record shorter than its fixed prefix"));
    }
    let mut buf = bytes;
    let total = buf.get_u32_le() as usize;
    if total != bytes.len() {
        return Err(corrupt(format!(
            "record size mismatch: header says {}, got {} bytes",
            total,
            bytes.len()
        )));
    }
    decode_body(buf)
}

/// Read the next record from a stream.
///
/// Returns `Ok(None)` on a clean end of stream at a record boundary; a
/// partial record is corruption.
pub fn read_entry<R: Read>(reader: &mut R) -> Result<Option<Entry>> {
    let mut size_bytes = [0u8; 4];
    let mut filled = 0;
    while filled < size_bytes.len() {
        match reader.read(&mut size_bytes[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if filled == 0 {
        return Ok(None);
    }
    if filled < size_bytes.len() {
        return Err(corrupt("truncated record size"));
    }

    let total = u32::from_le_bytes(size_bytes) as usize;
    if total < RECORD_PREFIX {
        return Err(corrupt(format!("record size {} is below the minimum", total)));
    }

    let mut body = vec![0u8; total - 4];
    reader.read_exact(&mut body).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            corrupt("truncated record body")
        } else {
            StrataError::Io(e)
        }
    })?;

    decode_body(&body).map(Some)
}

/// Decode everything after TotalSize
fn decode_body(mut buf: &[u8]) -> Result<Entry> {
    if buf.remaining() < RECORD_PREFIX - 4 {
        return Err(corrupt("record shorter than its fixed prefix"));
    }
    let deleted = match buf.get_u8() {
        0 => false,
        1 => true,
        other => return Err(corrupt(format!("invalid deleted flag {}", other))),
    };
    let store_mode = buf.get_u8();
    let key_len = buf.get_u32_le() as usize;
    if buf.remaining() < key_len {
        return Err(corrupt("key extends past the record"));
    }
    let key = buf[..key_len].to_vec();
    buf.advance(key_len);

    let value = match (deleted, store_mode) {
        (true, STORE_INLINE) => {
            read_value(&mut buf)?;
            EntryValue::Tombstone
        }
        (false, STORE_INLINE) => EntryValue::Inline(read_value(&mut buf)?),
        (false, STORE_POINTER) => {
            if buf.remaining() < ValueAddress::ENCODED_LEN {
                return Err(corrupt("value address extends past the record"));
            }
            let segment_id = buf.get_u64_le();
            let offset = buf.get_u64_le();
            EntryValue::Pointer(ValueAddress::new(segment_id, offset))
        }
        (deleted, mode) => {
            return Err(corrupt(format!(
                "invalid store mode {} (deleted = {})",
                mode, deleted
            )))
        }
    };

    if buf.has_remaining() {
        return Err(corrupt(format!("{} trailing bytes after record", buf.remaining())));
    }

    Ok(Entry { key, value })
}

fn read_value(buf: &mut &[u8]) -> Result<Vec<u8>> {
    if buf.remaining() < 4 {
        return Err(corrupt("value length extends past the record"));
    }
    let value_len = buf.get_u32_le() as usize;
    if buf.remaining() < value_len {
        return Err(corrupt("value extends past the record"));
    }
    let value = buf[..value_len].to_vec();
    buf.advance(value_len);
    Ok(value)
}

fn corrupt(msg: impl Into<String>) -> StrataError {
    StrataError::Corruption(format!("SSTable record: {}", msg.into()))
}
