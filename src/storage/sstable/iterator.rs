//! SSTable Iterator
//!
//! Sequential iteration over all entries in an SSTable.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::entry::Entry;
use crate::error::Result;

use super::record::read_entry;

/// Forward-only iterator over SSTable entries in sorted key order
///
/// Owns its file handle, so several iterators can be open at once (the
/// compactor keeps one per input table).
pub struct SSTableIterator {
    reader: BufReader<File>,
    /// Set after EOF or the first error
    done: bool,
}

impl SSTableIterator {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            done: false,
        })
    }
}

impl Iterator for SSTableIterator {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match read_entry(&mut self.reader) {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
