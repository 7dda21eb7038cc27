//! # StrataKV
//!
//! An embedded log-structured merge key-value storage engine with:
//! - A skip-list MemTable fed through a write-ahead log
//! - Optional key/value separation through a value log
//! - Immutable SSTables organised in levels, tracked by a manifest
//! - Background flushes with synchronous, cascading compaction
//! - Crash recovery from logs and the manifest snapshot
//!
//! ## Architecture Overview
//!
//! ```text
//!              put / delete                       get
//!                   │                              │
//! ┌─────────────────▼──────────────────────────────▼────────────┐
//! │                         Engine                               │
//! │            (Single Writer / Multi Reader)                    │
//! └───────┬─────────────────────┬──────────────────────┬────────┘
//!         │                     │                      │
//!         ▼                     ▼                      ▼
//!  ┌─────────────┐      ┌───────────────┐      ┌──────────────┐
//!  │ WAL / VLog  │ ───► │   MemTable    │ ───► │  Immutable   │
//!  │  (Append)   │      │  (SkipList)   │      │  MemTables   │
//!  └─────────────┘      └───────────────┘      └──────┬───────┘
//!                                                     │ flush (background)
//!                                                     ▼
//!                                              ┌──────────────┐
//!                                              │   Manifest   │
//!                                              │  L0 .. Ln    │──► compaction
//!                                              └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod entry;
pub mod layout;
pub mod ids;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod background;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StrataError, Result};
pub use config::{Config, ConfigBuilder, WalSyncStrategy};
pub use engine::{Engine, EngineStats};
pub use entry::{Entry, EntryValue, ValueAddress};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StrataKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
