//! Skip list index for the memtable
//!
//! Nodes live in an arena (`Vec<SkipNode>`) and link to each other by index.
//! Every level is a doubly linked list between a HEAD and a TAIL sentinel;
//! towers are joined by `up`/`down` links.
//!
//! ```text
//! Level 2:  HEAD ─────────────────────────► 50 ─────────────► TAIL
//!             │                              │                  │
//! Level 1:  HEAD ─────────► 20 ────────────► 50 ─────────────► TAIL
//!             │              │               │                  │
//! Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 50 ──► 60 ──► TAIL
//! ```
//!
//! Level 0 holds every entry, tombstones included. Upper levels only hold
//! key copies used to skip ahead.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::entry::{Entry, EntryValue};
use crate::error::{Result, StrataError};
use crate::storage::sstable::{SSTableBuilder, TableSummary};

/// Arena slot of the level-0 HEAD sentinel
const BOTTOM_HEAD: usize = 0;
/// Arena slot of the level-0 TAIL sentinel
const BOTTOM_TAIL: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Head,
    Tail,
    Entry,
}

#[derive(Debug)]
struct SkipNode {
    kind: NodeKind,
    key: Vec<u8>,
    /// Only level-0 entry nodes carry a value
    value: Option<EntryValue>,
    left: Option<usize>,
    right: Option<usize>,
    up: Option<usize>,
    down: Option<usize>,
}

impl SkipNode {
    fn sentinel(kind: NodeKind) -> Self {
        Self {
            kind,
            key: Vec::new(),
            value: None,
            left: None,
            right: None,
            up: None,
            down: None,
        }
    }

    fn entry(key: Vec<u8>, value: Option<EntryValue>) -> Self {
        Self {
            kind: NodeKind::Entry,
            key,
            value,
            left: None,
            right: None,
            up: None,
            down: None,
        }
    }
}

/// Probabilistically balanced ordered map from key to `EntryValue`
pub struct SkipList {
    nodes: Vec<SkipNode>,
    /// Top-level HEAD sentinel
    head: usize,
    /// Top-level TAIL sentinel
    tail: usize,
    /// Entries at level 0, tombstones included
    size: usize,
    /// Index levels above level 0
    level: usize,
    probability: f64,
    max_level: usize,
    rng: StdRng,
}

impl SkipList {
    pub fn new(probability: f64, max_level: usize) -> Self {
        Self::with_rng(probability, max_level, StdRng::from_entropy())
    }

    /// Deterministic tower heights, for tests
    pub fn with_seed(probability: f64, max_level: usize, seed: u64) -> Self {
        Self::with_rng(probability, max_level, StdRng::seed_from_u64(seed))
    }

    fn with_rng(probability: f64, max_level: usize, rng: StdRng) -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(SkipNode::sentinel(NodeKind::Head));
        nodes.push(SkipNode::sentinel(NodeKind::Tail));
        nodes[BOTTOM_HEAD].right = Some(BOTTOM_TAIL);
        nodes[BOTTOM_TAIL].left = Some(BOTTOM_HEAD);

        Self {
            nodes,
            head: BOTTOM_HEAD,
            tail: BOTTOM_TAIL,
            size: 0,
            level: 0,
            probability,
            max_level,
            rng,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert or overwrite. Returns true if a new entry was created.
    ///
    /// An existing key is updated in place; its tower is left alone.
    pub fn put(&mut self, key: Vec<u8>, value: EntryValue) -> bool {
        let pred = self.find_predecessor(&key);
        if self.is_match(pred, &key) {
            self.nodes[pred].value = Some(value);
            return false;
        }

        let node = self.alloc(SkipNode::entry(key.clone(), Some(value)));
        self.insert_after(pred, node);
        self.size += 1;

        let mut below = node;
        let mut anchor = pred;
        let mut attempt = 0;
        while attempt < self.max_level && self.rng.gen::<f64>() < self.probability {
            if attempt >= self.level {
                self.grow();
            }

            // Nearest node to the left that has a tower above it
            while self.nodes[anchor].up.is_none() {
                match self.nodes[anchor].left {
                    Some(left) => anchor = left,
                    None => return true,
                }
            }
            let Some(upper) = self.nodes[anchor].up else {
                return true;
            };
            anchor = upper;

            let index = self.alloc(SkipNode::entry(key.clone(), None));
            self.insert_after(anchor, index);
            self.nodes[index].down = Some(below);
            self.nodes[below].up = Some(index);

            below = index;
            attempt += 1;
        }

        true
    }

    /// Mark `key` deleted. Returns true if a new entry was created.
    pub fn remove(&mut self, key: Vec<u8>) -> bool {
        self.put(key, EntryValue::Tombstone)
    }

    fn alloc(&mut self, node: SkipNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn insert_after(&mut self, pred: usize, node: usize) {
        let next = self.nodes[pred].right;
        self.nodes[node].left = Some(pred);
        self.nodes[node].right = next;
        self.nodes[pred].right = Some(node);
        if let Some(next) = next {
            self.nodes[next].left = Some(node);
        }
    }

    /// Add an empty level on top
    fn grow(&mut self) {
        let head = self.alloc(SkipNode::sentinel(NodeKind::Head));
        let tail = self.alloc(SkipNode::sentinel(NodeKind::Tail));

        self.nodes[head].right = Some(tail);
        self.nodes[tail].left = Some(head);

        self.nodes[head].down = Some(self.head);
        self.nodes[self.head].up = Some(head);
        self.nodes[tail].down = Some(self.tail);
        self.nodes[self.tail].up = Some(tail);

        self.head = head;
        self.tail = tail;
        self.level += 1;
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The level-0 node holding `key`, or the last level-0 node before where
    /// `key` would go (possibly HEAD).
    fn find_predecessor(&self, key: &[u8]) -> usize {
        let mut node = self.head;
        loop {
            while let Some(next) = self.nodes[node].right {
                let next_node = &self.nodes[next];
                if next_node.kind == NodeKind::Tail || next_node.key.as_slice() > key {
                    break;
                }
                node = next;
            }
            match self.nodes[node].down {
                Some(down) => node = down,
                None => return node,
            }
        }
    }

    fn is_match(&self, node: usize, key: &[u8]) -> bool {
        let node = &self.nodes[node];
        node.kind == NodeKind::Entry && node.key.as_slice() == key
    }

    /// `Some(Tombstone)` means found but deleted; `None` means absent
    pub fn search(&self, key: &[u8]) -> Option<EntryValue> {
        let pred = self.find_predecessor(key);
        if self.is_match(pred, key) {
            self.nodes[pred].value.clone()
        } else {
            None
        }
    }

    /// All entries in key order, tombstones included
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            node: self.nodes[BOTTOM_HEAD].right,
        }
    }

    /// Keys whose latest entry is not a tombstone, in order
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.iter()
            .filter(|(_, value)| !value.is_tombstone())
            .map(|(key, _)| key.to_vec())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Index levels above level 0
    pub fn height(&self) -> usize {
        self.level
    }

    // =========================================================================
    // Flush
    // =========================================================================

    /// Write every entry to a new SSTable at `path` and fsync it
    pub fn flush(&self, path: &Path) -> Result<TableSummary> {
        let mut builder = SSTableBuilder::create(path)?;
        for (key, value) in self.iter() {
            builder.add(&Entry::new(key.to_vec(), value.clone()))?;
        }
        builder.finish()
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Walk every level and verify links, ordering and towers
    pub fn check_invariants(&self) -> Result<()> {
        let mut level_head = Some(BOTTOM_HEAD);
        let mut depth = 0;

        while let Some(head) = level_head {
            let mut count = 0;
            let mut prev = head;
            let mut prev_key: Option<&[u8]> = None;

            loop {
                let Some(next) = self.nodes[prev].right else {
                    return Err(corrupt(format!("level {} has no TAIL", depth)));
                };
                if self.nodes[next].left != Some(prev) {
                    return Err(corrupt(format!("broken left link at level {}", depth)));
                }
                let node = &self.nodes[next];
                if node.kind == NodeKind::Tail {
                    break;
                }
                if node.kind != NodeKind::Entry {
                    return Err(corrupt(format!("stray sentinel at level {}", depth)));
                }
                if let Some(prev_key) = prev_key {
                    if node.key.as_slice() <= prev_key {
                        return Err(corrupt(format!("keys out of order at level {}", depth)));
                    }
                }

                if depth == 0 {
                    if node.value.is_none() || node.down.is_some() {
                        return Err(corrupt("level 0 node without a value".to_string()));
                    }
                } else {
                    let Some(down) = node.down else {
                        return Err(corrupt(format!("index node at level {} has no down link", depth)));
                    };
                    let below = &self.nodes[down];
                    if below.key != node.key || below.up != Some(next) {
                        return Err(corrupt(format!("tower mismatch at level {}", depth)));
                    }
                }

                prev_key = Some(node.key.as_slice());
                prev = next;
                count += 1;
            }

            if depth == 0 && count != self.size {
                return Err(corrupt(format!(
                    "size is {} but level 0 holds {} entries",
                    self.size, count
                )));
            }

            level_head = self.nodes[head].up;
            depth += 1;
        }

        if depth != self.level + 1 {
            return Err(corrupt(format!(
                "height is {} but found {} index levels",
                self.level,
                depth - 1
            )));
        }
        Ok(())
    }
}

fn corrupt(msg: String) -> StrataError {
    StrataError::Corruption(format!("skip list: {}", msg))
}

/// Iterator over level 0
pub struct Iter<'a> {
    list: &'a SkipList,
    node: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a EntryValue);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = &self.list.nodes[self.node?];
            if node.kind != NodeKind::Entry {
                self.node = None;
                return None;
            }
            self.node = node.right;
            if let Some(value) = &node.value {
                return Some((node.key.as_slice(), value));
            }
        }
    }
}
