//! One level of the LSM tree

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::entry::EntryValue;
use crate::error::{Result, StrataError};
use crate::storage::sstable::{SSTableMeta, SSTableReader};

/// The tables at one level, in insertion order (oldest first)
pub struct Level {
    number: u32,
    tables: RwLock<Vec<SSTableMeta>>,
}

impl Level {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            tables: RwLock::new(Vec::new()),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Returns the number of SSTables in the level.
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    /// Returns true if the level is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Copy of the table list
    pub fn snapshot(&self) -> Vec<SSTableMeta> {
        self.tables.read().clone()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<SSTableMeta>> {
        self.tables.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Vec<SSTableMeta>> {
        self.tables.write()
    }

    /// Append a table (newest last)
    pub fn add(&self, meta: SSTableMeta) -> Result<()> {
        Self::add_to(&mut self.tables.write(), meta)
    }

    pub(crate) fn add_to(tables: &mut Vec<SSTableMeta>, meta: SSTableMeta) -> Result<()> {
        if tables.iter().any(|t| t.id == meta.id) {
            return Err(StrataError::DuplicateTable(meta.id));
        }
        tables.push(meta);
        Ok(())
    }

    /// Remove tables by id, returning the ones that were present
    pub fn remove(&self, ids: &[u64]) -> Vec<SSTableMeta> {
        Self::remove_from(&mut self.tables.write(), ids)
    }

    pub(crate) fn remove_from(tables: &mut Vec<SSTableMeta>, ids: &[u64]) -> Vec<SSTableMeta> {
        let mut removed = Vec::new();
        tables.retain(|t| {
            if ids.contains(&t.id) {
                removed.push(t.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Tables to push down when this level overflows.
    ///
    /// Level 0 tables overlap each other, so the whole level goes. Deeper
    /// levels give up only their oldest table.
    pub fn compaction_candidates(&self) -> Vec<SSTableMeta> {
        let tables = self.tables.read();
        if self.number == 0 {
            tables.clone()
        } else {
            tables.first().cloned().into_iter().collect()
        }
    }

    /// Tables whose key range intersects the span of `candidates`.
    ///
    /// The span is `[min of min_key, max of max_key]`, gaps between
    /// candidates included: the merged output covers the whole span, so a
    /// table sitting in a gap has to be merged too.
    pub fn overlapping(&self, candidates: &[SSTableMeta]) -> Vec<SSTableMeta> {
        let Some(min_key) = candidates.iter().map(|c| &c.min_key).min() else {
            return Vec::new();
        };
        let Some(max_key) = candidates.iter().map(|c| &c.max_key).max() else {
            return Vec::new();
        };

        self.tables
            .read()
            .iter()
            .filter(|t| t.max_key >= *min_key && *max_key >= t.min_key)
            .cloned()
            .collect()
    }

    /// Look up `key`, newest table first.
    ///
    /// The read lock is held while files are scanned so a compaction cannot
    /// delete one underneath the lookup.
    pub fn get(&self, key: &[u8]) -> Result<Option<EntryValue>> {
        let tables = self.tables.read();
        for meta in tables.iter().rev() {
            // Skip SSTable if key is outside its range (O(1) check)
            if !meta.might_contain(key) {
                continue;
            }
            if let Some(value) = SSTableReader::open(meta.path())?.get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}
