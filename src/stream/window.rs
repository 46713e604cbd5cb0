//! §3/§8 "block-index window": an ordered, contiguous map of
//! `start_offset -> BlockEntry` plus the offset the window has explored so
//! far. Grounded on §9's "block window container" note — a plain
//! `BTreeMap` plus a handful of range helpers, rather than a bespoke
//! skip-list or interval tree the original's note explicitly argues against
//! over-engineering.

use std::collections::BTreeMap;

use crate::error::StreamError;

use super::entry::BlockEntry;

/// Ordered, contiguous view of known block positions for one stream.
#[derive(Debug, Default)]
pub struct BlockWindow {
    blocks: BTreeMap<u64, BlockEntry>,
}

impl BlockWindow {
    pub fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Exclusive end offset the window currently covers, or `None` if empty.
    pub fn loaded_end_offset(&self) -> Option<u64> {
        self.blocks.values().next_back().map(|e| e.end_offset())
    }

    pub fn first_entry(&self) -> Option<&BlockEntry> {
        self.blocks.values().next()
    }

    pub fn last_entry(&self) -> Option<&BlockEntry> {
        self.blocks.values().next_back()
    }

    /// The entry whose range contains `offset`, if any is currently loaded.
    pub fn entry_containing(&self, offset: u64) -> Option<&BlockEntry> {
        self.blocks
            .range(..=offset)
            .next_back()
            .map(|(_, e)| e)
            .filter(|e| e.contains(offset))
    }

    /// Iterate entries whose range overlaps `[start, end)`, in order.
    pub fn tail_range(&self, start: u64) -> impl Iterator<Item = &BlockEntry> {
        self.blocks
            .range(..)
            .filter(move |(_, e)| e.end_offset() > start)
            .map(|(_, e)| e)
    }

    /// Append a new entry, enforcing that it abuts the current tail exactly
    /// (§3's window-contiguity invariant). The first entry in an empty
    /// window is accepted at any start offset.
    pub fn push_back(&mut self, entry: BlockEntry) -> Result<(), StreamError> {
        if let Some(expected) = self.loaded_end_offset() {
            if entry.start_offset() != expected {
                return Err(StreamError::BlockNotContinuous {
                    expected,
                    found: entry.start_offset(),
                });
            }
        }
        self.blocks.insert(entry.start_offset(), entry);
        Ok(())
    }

    /// Drop entries that end at or before `offset` — blocks the reader has
    /// fully consumed and will never seek back into.
    pub fn remove_before(&mut self, offset: u64) {
        self.blocks.retain(|_, e| e.end_offset() > offset);
    }

    /// Drop all entries, e.g. after a compaction forces the window to be
    /// rebuilt from scratch (§4.1 retry policy).
    pub fn reset(&mut self) {
        self.blocks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::BlockIndex;

    fn meta(object_id: u64) -> crate::object::ObjectMetadata {
        crate::object::ObjectMetadata {
            object_id,
            stream_id: 1,
        }
    }

    fn entry(start: u64, end: u64) -> BlockEntry {
        BlockEntry::new(meta(1), BlockIndex::new(start, end, end - start))
    }

    #[test]
    fn push_back_enforces_contiguity() {
        let mut window = BlockWindow::new();
        window.push_back(entry(0, 100)).unwrap();
        window.push_back(entry(100, 250)).unwrap();
        assert_eq!(window.loaded_end_offset(), Some(250));

        let err = window.push_back(entry(300, 400)).unwrap_err();
        assert!(matches!(err, StreamError::BlockNotContinuous { expected: 250, found: 300 }));
    }

    #[test]
    fn entry_containing_finds_the_right_block() {
        let mut window = BlockWindow::new();
        window.push_back(entry(0, 100)).unwrap();
        window.push_back(entry(100, 250)).unwrap();

        assert_eq!(window.entry_containing(150).unwrap().start_offset(), 100);
        assert!(window.entry_containing(250).is_none());
    }

    #[test]
    fn remove_before_trims_consumed_entries() {
        let mut window = BlockWindow::new();
        window.push_back(entry(0, 100)).unwrap();
        window.push_back(entry(100, 250)).unwrap();

        window.remove_before(100);
        assert_eq!(window.len(), 1);
        assert_eq!(window.first_entry().unwrap().start_offset(), 100);
    }
}
