//! Manifest
//!
//! Tracks which SSTables exist at which level and keeps that list durable.
//!
//! ## Responsibilities
//! - Register flushed tables at level 0
//! - Compact a level into the next one when it holds too many tables
//! - Point lookups across levels, newest data first
//! - Rewrite the snapshot file after every structural change
//! - Rebuild itself on startup (snapshot, or directory listing as fallback)

mod file;
mod level;

use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::entry::EntryValue;
use crate::error::{Result, StrataError};
use crate::ids::IdAllocator;
use crate::layout::Layout;

use super::compaction::Compactor;
use super::sstable::{scan_summary, SSTableMeta};

pub use level::Level;

/// Table and compaction counts per level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestStats {
    pub tables_per_level: Vec<usize>,
    pub compactions_per_level: Vec<u64>,
}

/// All levels of the tree
///
/// ## Concurrency:
/// - each `Level` has its own RwLock; lookups hold it while scanning files
/// - `update_lock` orders structural changes so snapshots are written in
///   the same order the changes were made
pub struct Manifest {
    layout: Layout,
    levels: Vec<Level>,
    /// Completed compactions out of each level
    compactions: Vec<AtomicU64>,
    compactor: Compactor,
    level_table_threshold: usize,
    update_lock: Mutex<()>,
}

impl Manifest {
    /// Load the manifest for `layout`, recovering from a crash if needed
    pub fn open(layout: Layout, config: &Config, ids: Arc<IdAllocator>) -> Result<Self> {
        let levels = (0..config.max_level_count).map(Level::new).collect();
        let compactions = (0..config.max_level_count)
            .map(|_| AtomicU64::new(0))
            .collect();
        let compactor = Compactor::new(layout.clone(), ids.clone(), config.max_sstable_entries);

        let manifest = Self {
            layout,
            levels,
            compactions,
            compactor,
            level_table_threshold: config.level_table_threshold,
            update_lock: Mutex::new(()),
        };

        if manifest.layout.manifest_path().exists() {
            manifest.load_snapshot(&ids)?;
        } else {
            manifest.rebuild_from_directory(&ids)?;
        }

        tracing::info!(tables = ?manifest.stats().tables_per_level, "Opened manifest");
        Ok(manifest)
    }

    fn load_snapshot(&self, ids: &IdAllocator) -> Result<()> {
        let tables = file::load(&self.layout.manifest_path())?;
        let mut referenced = HashSet::with_capacity(tables.len());

        for mut meta in tables {
            self.check_level(meta.level)?;
            // Paths are re-derived so a moved data directory still opens
            meta.file_path = self.layout.table_path(meta.id);
            if !meta.file_path.is_file() {
                return Err(StrataError::Corruption(format!(
                    "MANIFEST references missing table {}",
                    meta.file_path.display()
                )));
            }
            ids.observe_table_id(meta.id);
            referenced.insert(meta.id);
            self.levels[meta.level as usize].add(meta)?;
        }

        // Tables written by a flush or compaction that never got registered
        for entry in fs::read_dir(self.layout.table_dir())? {
            let path = entry?.path();
            if let Some(id) = self.layout.parse_table_id(&path) {
                if !referenced.contains(&id) {
                    tracing::warn!(id, path = %path.display(), "Removing unreferenced table");
                    fs::remove_file(&path)?;
                }
            }
        }
        Ok(())
    }

    /// No snapshot: register every table file at level 0 in id order
    fn rebuild_from_directory(&self, ids: &IdAllocator) -> Result<()> {
        let mut found = Vec::new();
        for entry in fs::read_dir(self.layout.table_dir())? {
            let path = entry?.path();
            if let Some(id) = self.layout.parse_table_id(&path) {
                found.push((id, path));
            }
        }
        found.sort_unstable_by_key(|(id, _)| *id);

        for (id, path) in found {
            ids.observe_table_id(id);
            let summary = scan_summary(&path)?;
            if summary.is_empty() {
                tracing::warn!(id, "Removing empty table");
                fs::remove_file(&path)?;
                continue;
            }
            self.levels[0].add(SSTableMeta::new(id, 0, path, summary))?;
        }

        if !self.levels[0].is_empty() {
            tracing::warn!(
                tables = self.levels[0].len(),
                "No MANIFEST found; registered table files at level 0"
            );
        }
        let _guard = self.update_lock.lock();
        self.persist(&[])
    }

    // =========================================================================
    // Structural Changes
    // =========================================================================

    /// Register a new table and compact any level it pushes over threshold
    pub fn add_table(&self, meta: SSTableMeta) -> Result<()> {
        self.check_level(meta.level)?;
        let level = meta.level as usize;
        {
            let _guard = self.update_lock.lock();
            self.levels[level].add(meta)?;
            self.persist(&[])?;
        }
        self.compact_overflowing(level)
    }

    /// Unregister tables, persist, then delete their files
    pub fn remove_tables(&self, tables: &[SSTableMeta]) -> Result<()> {
        let ids: Vec<u64> = tables.iter().map(|t| t.id).collect();
        let mut removed = Vec::new();
        {
            let _guard = self.update_lock.lock();
            for level in &self.levels {
                removed.extend(level.remove(&ids));
            }
            self.persist(&[])?;
        }
        for meta in &removed {
            meta.delete_file()?;
        }
        Ok(())
    }

    fn compact_overflowing(&self, from: usize) -> Result<()> {
        let last = self.levels.len() - 1;
        for level in from..last {
            while self.levels[level].len() > self.level_table_threshold {
                self.compact_level(level as u32)?;
            }
        }
        Ok(())
    }

    /// Merge `level`'s candidates with the overlapping tables one level down
    pub fn compact_level(&self, level: u32) -> Result<()> {
        let last = self.levels.len() as u32 - 1;
        if level >= last {
            return Err(StrataError::InvalidLevel {
                level,
                max: self.levels.len() as u32,
            });
        }
        let target = level + 1;

        let candidates = self.compaction_candidates(level);
        if candidates.is_empty() {
            return Err(StrataError::EmptyCompaction(level));
        }
        let lower = self.overlapping_tables(&candidates, target);

        // Newer level-0 tables first, then the lower level
        let mut inputs: Vec<SSTableMeta> = candidates.iter().rev().cloned().collect();
        inputs.extend(lower.iter().cloned());

        let outputs = self.compactor.merge(&inputs, target, target == last)?;

        tracing::info!(
            level,
            upper = candidates.len(),
            lower = lower.len(),
            outputs = outputs.len(),
            "Compacted level"
        );
        self.apply_compaction(level, &candidates, &lower, outputs)
    }

    /// Swap inputs for outputs in one snapshot, then delete the inputs
    fn apply_compaction(
        &self,
        level: u32,
        upper: &[SSTableMeta],
        lower: &[SSTableMeta],
        outputs: Vec<SSTableMeta>,
    ) -> Result<()> {
        let source = level as usize;
        let target = source + 1;
        let upper_ids: Vec<u64> = upper.iter().map(|t| t.id).collect();
        let lower_ids: Vec<u64> = lower.iter().map(|t| t.id).collect();

        {
            let _guard = self.update_lock.lock();
            let mut src = self.levels[source].write();
            let mut dst = self.levels[target].write();

            Level::remove_from(&mut src, &upper_ids);
            Level::remove_from(&mut dst, &lower_ids);
            for meta in outputs {
                Level::add_to(&mut dst, meta)?;
            }
            self.persist(&[(source, &src), (target, &dst)])?;
        }

        for meta in upper.iter().chain(lower) {
            meta.delete_file()?;
        }
        self.compactions[source].fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Write the snapshot. `held` supplies levels whose lock the caller
    /// already holds. Caller must hold `update_lock`.
    fn persist(&self, held: &[(usize, &Vec<SSTableMeta>)]) -> Result<()> {
        let mut tables = Vec::new();
        for (i, level) in self.levels.iter().enumerate() {
            match held.iter().find(|(n, _)| *n == i) {
                Some((_, locked)) => tables.extend(locked.iter().cloned()),
                None => tables.extend(level.snapshot()),
            }
        }
        file::save(&self.layout.manifest_path(), &tables)
    }

    fn check_level(&self, level: u32) -> Result<()> {
        if level as usize >= self.levels.len() {
            return Err(StrataError::InvalidLevel {
                level,
                max: self.levels.len() as u32,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Level 0: every table. Deeper: the oldest table.
    pub fn compaction_candidates(&self, level: u32) -> Vec<SSTableMeta> {
        self.levels
            .get(level as usize)
            .map(Level::compaction_candidates)
            .unwrap_or_default()
    }

    /// Tables at `level` overlapping the key span of all candidates
    pub fn overlapping_tables(&self, candidates: &[SSTableMeta], level: u32) -> Vec<SSTableMeta> {
        self.levels
            .get(level as usize)
            .map(|l| l.overlapping(candidates))
            .unwrap_or_default()
    }

    /// Newest value for `key` across all levels; a tombstone is a hit
    pub fn get(&self, key: &[u8]) -> Result<Option<EntryValue>> {
        for level in &self.levels {
            if let Some(value) = level.get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Copy of one level's tables, oldest first
    pub fn level_tables(&self, level: u32) -> Vec<SSTableMeta> {
        self.levels
            .get(level as usize)
            .map(Level::snapshot)
            .unwrap_or_default()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn stats(&self) -> ManifestStats {
        ManifestStats {
            tables_per_level: self.levels.iter().map(Level::len).collect(),
            compactions_per_level: self
                .compactions
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
        }
    }
}
