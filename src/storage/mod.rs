//! Storage Module
//!
//! Persistent, leveled storage made of immutable SSTables.
//!
//! ## Responsibilities
//! - Persist flushed memtables as sorted tables at level 0
//! - Point lookups across levels, newest data first
//! - Compaction of overflowing levels into the next one
//! - Value-log reads for separated values
//!
//! ## Layout
//! ```text
//! Level 0:  [t7] [t8] [t9]          overlapping, newest last
//! Level 1:  [a..f] [g..m] [n..z]    non-overlapping
//! Level 2:  [a..c] [d..k] [l..z]
//!   ...
//! ```

pub mod compaction;
pub mod manifest;
pub mod sstable;
pub mod vlog;

pub use compaction::Compactor;
pub use manifest::{Level, Manifest, ManifestStats};
pub use sstable::{SSTableBuilder, SSTableIterator, SSTableMeta, SSTableReader, TableSummary};
pub use vlog::ValueLogReader;
