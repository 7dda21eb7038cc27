//! Manifest snapshot file
//!
//! ## Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Header: Magic "SKVM" (4) | Version (2)       │
//! ├──────────────────────────────────────────────┤
//! │ Record (repeated, level by level, oldest     │
//! │ table first within a level)                  │
//! │   Len (4) | CRC32 (4) | bincode(SSTableMeta) │
//! └──────────────────────────────────────────────┘
//! ```
//! The whole file is rewritten on every change: written to a temp file,
//! fsynced, then renamed over the old one.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, StrataError};
use crate::storage::sstable::SSTableMeta;

const MAGIC: &[u8; 4] = b"SKVM";
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 6;

/// Atomically replace the snapshot at `path`
pub fn save(path: &Path, tables: &[SSTableMeta]) -> Result<()> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + tables.len() * 96);
    buf.put_slice(MAGIC);
    buf.put_u16_le(VERSION);

    for meta in tables {
        let bytes = bincode::serialize(meta)?;
        buf.put_u32_le(bytes.len() as u32);
        buf.put_u32_le(crc32fast::hash(&bytes));
        buf.put_slice(&bytes);
    }

    let tmp_path = path.with_extension("tmp");
    let mut file = File::create(&tmp_path)?;
    file.write_all(&buf)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;

    // Fsync parent dir so the rename persists
    #[cfg(unix)]
    if let Some(parent) = path.parent() {
        File::open(parent)?.sync_all()?;
    }

    tracing::trace!(tables = tables.len(), "Persisted manifest");
    Ok(())
}

/// Read every table record from the snapshot at `path`
pub fn load(path: &Path) -> Result<Vec<SSTableMeta>> {
    let data = fs::read(path)?;
    let mut buf = data.as_slice();

    if buf.remaining() < HEADER_SIZE || &buf[..4] != MAGIC {
        return Err(corrupt("bad header"));
    }
    buf.advance(4);
    let version = buf.get_u16_le();
    if version != VERSION {
        return Err(corrupt(format!("unsupported version {}", version)));
    }

    let mut tables = Vec::new();
    while buf.has_remaining() {
        if buf.remaining() < 8 {
            return Err(corrupt("truncated record header"));
        }
        let len = buf.get_u32_le() as usize;
        let crc = buf.get_u32_le();
        if buf.remaining() < len {
            return Err(corrupt("truncated record"));
        }
        let bytes = &buf[..len];
        if crc32fast::hash(bytes) != crc {
            return Err(corrupt(format!("checksum mismatch in record {}", tables.len())));
        }
        tables.push(bincode::deserialize::<SSTableMeta>(bytes)?);
        buf.advance(len);
    }

    Ok(tables)
}

fn corrupt(msg: impl Into<String>) -> StrataError {
    StrataError::Corruption(format!("MANIFEST: {}", msg.into()))
}
