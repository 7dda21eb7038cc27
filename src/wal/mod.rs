//! Durability Log Module (WAL / value-log)
//!
//! Every accepted write is appended here before it reaches the skip list.
//!
//! ## Responsibilities
//! - Append records before any memtable mutation
//! - Seal (rename to silence) when the memtable rotates
//! - Delete (WAL) or retire (value-log) once the data is in an SSTable
//! - Crash recovery and replay, cutting off a partially written tail
//!
//! ## Inline WAL record
//! ```text
//! ┌─────────────┬─────────────┬─────┬───────────────┬───────┐
//! │ Deleted (1) │ KeyLen (4)  │ Key │ ValueLen (4)  │ Value │
//! └─────────────┴─────────────┴─────┴───────────────┴───────┘
//! ```
//! Deletions write ValueLen = 0 and no value bytes.
//!
//! ## Value-log record
//! ```text
//! ┌───────────────┬─────────────┬────────────┬─────┬──────────────┬───────┐
//! │ TotalSize (4) │ Deleted (1) │ KeyLen (4) │ Key │ ValueLen (4) │ Value │
//! └───────────────┴─────────────┴────────────┴─────┴──────────────┴───────┘
//! ```
//! TotalSize counts the whole record including itself. Deletions stop after
//! the key. A value address is the byte offset of the record's TotalSize.
//!
//! All integers are little-endian.

mod reader;
mod record;
mod recovery;
mod writer;

pub use reader::LogReader;
pub use record::{check_entry_len, decode_record, LogRecord, MAX_ENTRY_LEN};
pub use recovery::{LogFiles, LogRecovery, RecoveryResult};
pub use writer::{discard, retire, LogWriter};
