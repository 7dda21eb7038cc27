//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Single-writer/multi-reader access pattern
//! - Count entries for the rotation trigger
//! - Ordered iteration for SSTable creation
//!
//! ## Data Structure Choice
//! An arena skip list behind an RwLock. Every write goes to the durability
//! log first, then to the list.

mod skiplist;
mod table;

pub use skiplist::{Iter, SkipList};
pub use table::{MemTable, MemTableOptions};
