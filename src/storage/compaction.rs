//! Compaction
//!
//! K-way merge of sorted tables into new, non-overlapping output tables.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::entry::Entry;
use crate::error::{Result, StrataError};
use crate::ids::IdAllocator;
use crate::layout::Layout;

use super::sstable::{SSTableBuilder, SSTableIterator, SSTableMeta};

/// Head record of one input, ordered for a min-heap on (key, rank)
struct HeapEntry {
    entry: Entry,
    /// Lower rank wins on equal keys
    rank: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse both keys
        other
            .entry
            .key
            .cmp(&self.entry.key)
            .then_with(|| other.rank.cmp(&self.rank))
    }
}

/// Writes merged tables for the manifest
pub struct Compactor {
    layout: Layout,
    ids: Arc<IdAllocator>,
    max_sstable_entries: u64,
}

impl Compactor {
    pub fn new(layout: Layout, ids: Arc<IdAllocator>, max_sstable_entries: u64) -> Self {
        Self {
            layout,
            ids,
            max_sstable_entries,
        }
    }

    /// Merge `inputs` into new tables at `target_level`.
    ///
    /// `inputs` is in priority order: on equal keys the earlier input wins
    /// and every later copy is discarded. Tombstones are dropped when
    /// `drop_tombstones` is set. Outputs roll over every
    /// `max_sstable_entries` records.
    pub fn merge(
        &self,
        inputs: &[SSTableMeta],
        target_level: u32,
        drop_tombstones: bool,
    ) -> Result<Vec<SSTableMeta>> {
        if inputs.is_empty() {
            return Err(StrataError::EmptyCompaction(target_level.saturating_sub(1)));
        }

        let mut readers = Vec::with_capacity(inputs.len());
        let mut heap = BinaryHeap::with_capacity(inputs.len());
        for (rank, meta) in inputs.iter().enumerate() {
            let mut reader = SSTableIterator::open(meta.path())?;
            if let Some(entry) = reader.next().transpose()? {
                heap.push(HeapEntry { entry, rank });
            }
            readers.push(reader);
        }

        let mut outputs = Vec::new();
        let mut current: Option<(u64, SSTableBuilder)> = None;
        let mut last_key: Option<Vec<u8>> = None;

        while let Some(HeapEntry { entry, rank }) = heap.pop() {
            if let Some(next) = readers[rank].next().transpose()? {
                heap.push(HeapEntry { entry: next, rank });
            }

            if last_key.as_deref() == Some(entry.key.as_slice()) {
                continue;
            }
            last_key = Some(entry.key.clone());

            if drop_tombstones && entry.is_tombstone() {
                continue;
            }

            if current.is_none() {
                let id = self.ids.next_table_id();
                let builder = SSTableBuilder::create(&self.layout.table_path(id))?;
                current = Some((id, builder));
            }
            if let Some((id, mut builder)) = current.take() {
                builder.add(&entry)?;
                if builder.entry_count() >= self.max_sstable_entries {
                    outputs.push(self.finish_output(id, builder, target_level)?);
                } else {
                    current = Some((id, builder));
                }
            }
        }

        if let Some((id, builder)) = current {
            outputs.push(self.finish_output(id, builder, target_level)?);
        }

        tracing::debug!(
            inputs = inputs.len(),
            outputs = outputs.len(),
            target_level,
            "Merged tables"
        );
        Ok(outputs)
    }

    fn finish_output(&self, id: u64, builder: SSTableBuilder, level: u32) -> Result<SSTableMeta> {
        let path = builder.path().to_path_buf();
        let summary = builder.finish()?;
        Ok(SSTableMeta::new(id, level, path, summary))
    }
}
