//! Error types for StrataKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

/// Unified error type for StrataKV operations
///
/// A missing key is never an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StrataError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Corruption / Invariant Violations
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("SSTable level {level} is out of range (max level count {max})")]
    InvalidLevel { level: u32, max: u32 },

    // -------------------------------------------------------------------------
    // Logical Errors
    // -------------------------------------------------------------------------
    #[error("SSTable {0} is already registered")]
    DuplicateTable(u64),

    #[error("No compaction candidates at level {0}")]
    EmptyCompaction(u32),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Entry of {len} bytes exceeds the {max} byte record limit")]
    EntryTooLarge { len: u64, max: u64 },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Background Worker Errors
    // -------------------------------------------------------------------------
    #[error("Background worker failed: {0}")]
    Background(String),
}

impl From<bincode::Error> for StrataError {
    fn from(err: bincode::Error) -> Self {
        StrataError::Serialization(err.to_string())
    }
}
