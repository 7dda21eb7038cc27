//! Logical records shared by the memtable, the logs and the SSTables.

use serde::{Deserialize, Serialize};

/// Location of a record inside a value-log segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueAddress {
    /// Id of the value-log segment (the numeric suffix of its file name)
    pub segment_id: u64,
    /// Byte offset of the record inside the segment
    pub offset: u64,
}

impl ValueAddress {
    /// Encoded size: segment_id (8) + offset (8)
    pub const ENCODED_LEN: usize = 16;

    pub fn new(segment_id: u64, offset: u64) -> Self {
        Self { segment_id, offset }
    }
}

/// What a key maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    /// A live value stored inline
    Inline(Vec<u8>),

    /// A live value stored in the value-log
    Pointer(ValueAddress),

    /// A deletion marker shadowing older values
    Tombstone,
}

impl EntryValue {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, EntryValue::Tombstone)
    }
}

/// A key with its value, address or tombstone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: EntryValue,
}

impl Entry {
    pub fn new(key: impl Into<Vec<u8>>, value: EntryValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn inline(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, EntryValue::Inline(value.into()))
    }

    pub fn pointer(key: impl Into<Vec<u8>>, address: ValueAddress) -> Self {
        Self::new(key, EntryValue::Pointer(address))
    }

    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self::new(key, EntryValue::Tombstone)
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_tombstone()
    }
}
