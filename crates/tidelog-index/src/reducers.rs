//! Reducers driven by [`IndexReader::consume`].
//!
//! A compaction pass is two reductions over the same index: the first finds
//! the latest offset of every key ([`CompactionKeyReducer`]), the second
//! copies only those entries into a fresh index ([`FilteredCopyReducer`]).

use std::collections::{HashMap, VecDeque};
use std::mem::size_of;
use std::ops::ControlFlow;

use bytes::Bytes;
use tidelog_types::Offset;
use tracing::debug;

use crate::{CompactedOffsetList, Entry, IndexError, IndexReader, IndexWriter, KeepSet};

/// Visitor fed one entry at a time by [`IndexReader::consume`].
pub trait Reducer {
    type Output;

    /// Handles one entry. Returning `Break` ends the pass early.
    fn reduce(&mut self, entry: Entry) -> Result<ControlFlow<()>, IndexError>;

    /// Produces the result once the pass ends.
    fn finish(self) -> Result<Self::Output, IndexError>;
}

// ============================================================================
// CompactionKeyReducer
// ============================================================================

/// Computes the set of offsets that hold the latest value of each key.
///
/// Keys are tracked in a map bounded by a byte budget. When a new key does
/// not fit, the oldest tracked keys are evicted and their current offsets
/// committed to the [`KeepSet`]. A later occurrence of an evicted key is then
/// tracked afresh, so both offsets survive: the result may keep stale
/// entries, but never drops the latest one.
#[derive(Debug)]
pub struct CompactionKeyReducer {
    budget: usize,
    used: usize,
    latest: HashMap<Bytes, Offset>,
    /// Tracked keys in insertion order; the front is evicted first.
    order: VecDeque<Bytes>,
    keep: KeepSet,
    evictions: u64,
}

impl CompactionKeyReducer {
    /// Creates a reducer tracking at most `max_memory` bytes of keys.
    pub fn new(max_memory: usize) -> Self {
        Self {
            budget: max_memory,
            used: 0,
            latest: HashMap::new(),
            order: VecDeque::new(),
            keep: KeepSet::new(),
            evictions: 0,
        }
    }

    /// Memory charged for tracking a key of `key_len` bytes.
    pub fn entry_cost(key_len: usize) -> usize {
        key_len + size_of::<(Bytes, Offset)>() + size_of::<Bytes>()
    }

    /// Keys evicted under memory pressure so far.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    fn evict_oldest(&mut self) {
        let Some(key) = self.order.pop_front() else {
            return;
        };
        if let Some(offset) = self.latest.remove(&key) {
            self.keep.insert(offset);
        }
        self.used -= Self::entry_cost(key.len());
        self.evictions += 1;
    }
}

impl Default for CompactionKeyReducer {
    /// A reducer without a memory bound, which keeps exactly one offset per key.
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl Reducer for CompactionKeyReducer {
    type Output = KeepSet;

    fn reduce(&mut self, entry: Entry) -> Result<ControlFlow<()>, IndexError> {
        if let Some(offset) = self.latest.get_mut(&entry.key) {
            *offset = entry.offset;
            return Ok(ControlFlow::Continue(()));
        }

        let cost = Self::entry_cost(entry.key.len());
        while self.used.saturating_add(cost) > self.budget && !self.latest.is_empty() {
            self.evict_oldest();
        }
        self.used = self.used.saturating_add(cost);
        self.order.push_back(entry.key.clone());
        self.latest.insert(entry.key, entry.offset);
        Ok(ControlFlow::Continue(()))
    }

    fn finish(mut self) -> Result<KeepSet, IndexError> {
        let tracked = self.latest.len();
        for offset in self.latest.into_values() {
            self.keep.insert(offset);
        }
        debug!(
            kept = self.keep.cardinality(),
            tracked,
            evictions = self.evictions,
            budget = self.budget,
            "computed compaction keep set"
        );
        Ok(self.keep)
    }
}

// ============================================================================
// FilteredCopyReducer
// ============================================================================

/// Copies entries whose offset is in a [`KeepSet`] into another index.
///
/// The destination writer is borrowed; closing it is the caller's job. The
/// output is the number of entries copied.
#[derive(Debug)]
pub struct FilteredCopyReducer<'a> {
    keep: KeepSet,
    writer: &'a mut IndexWriter,
    copied: u64,
}

impl<'a> FilteredCopyReducer<'a> {
    pub fn new(keep: KeepSet, writer: &'a mut IndexWriter) -> Self {
        Self {
            keep,
            writer,
            copied: 0,
        }
    }
}

impl Reducer for FilteredCopyReducer<'_> {
    type Output = u64;

    fn reduce(&mut self, entry: Entry) -> Result<ControlFlow<()>, IndexError> {
        if self.keep.contains(entry.offset) {
            self.writer.index(
                entry.discriminator,
                entry.raw_key(),
                entry.offset,
                entry.delta,
            )?;
            self.copied += 1;
        }
        Ok(ControlFlow::Continue(()))
    }

    fn finish(self) -> Result<u64, IndexError> {
        Ok(self.copied)
    }
}

// ============================================================================
// Small reducers
// ============================================================================

/// Collects every entry.
#[derive(Debug, Default)]
pub struct EntryCollector {
    entries: Vec<Entry>,
}

impl Reducer for EntryCollector {
    type Output = Vec<Entry>;

    fn reduce(&mut self, entry: Entry) -> Result<ControlFlow<()>, IndexError> {
        self.entries.push(entry);
        Ok(ControlFlow::Continue(()))
    }

    fn finish(self) -> Result<Vec<Entry>, IndexError> {
        Ok(self.entries)
    }
}

/// Accumulates entry offsets at or after a base into a [`CompactedOffsetList`].
#[derive(Debug)]
pub struct OffsetListReducer {
    list: CompactedOffsetList,
}

impl OffsetListReducer {
    pub fn new(base: Offset) -> Self {
        Self {
            list: CompactedOffsetList::new(base),
        }
    }
}

impl Reducer for OffsetListReducer {
    type Output = CompactedOffsetList;

    fn reduce(&mut self, entry: Entry) -> Result<ControlFlow<()>, IndexError> {
        self.list.add(entry.offset);
        Ok(ControlFlow::Continue(()))
    }

    fn finish(self) -> Result<CompactedOffsetList, IndexError> {
        Ok(self.list)
    }
}

// ============================================================================
// Whole-index helpers
// ============================================================================

/// Reads every entry of `reader` from the start.
pub fn read_all_entries(reader: &mut IndexReader) -> Result<Vec<Entry>, IndexError> {
    reader.reset();
    reader.consume(EntryCollector::default(), None)
}

/// Computes the exact keep set of `reader` with an unbounded key reducer.
pub fn natural_index_of_entries_to_keep(reader: &mut IndexReader) -> Result<KeepSet, IndexError> {
    reader.reset();
    reader.consume(CompactionKeyReducer::default(), None)
}

/// Lists every offset at or after `base` present in `reader`.
///
/// Run over a deduplicated index, the result tells segment rewriting which
/// records to keep.
pub fn generate_compacted_list(
    base: Offset,
    reader: &mut IndexReader,
) -> Result<CompactedOffsetList, IndexError> {
    reader.reset();
    reader.consume(OffsetListReducer::new(base), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidelog_types::BatchKind;

    fn entry(key: &'static [u8], offset: u64) -> Entry {
        Entry {
            discriminator: BatchKind::new(0),
            offset: Offset::new(offset),
            delta: 0,
            key: Bytes::from_static(key),
        }
    }

    fn run(reducer: &mut CompactionKeyReducer, entries: &[(&'static [u8], u64)]) {
        for &(key, offset) in entries {
            assert!(reducer.reduce(entry(key, offset)).unwrap().is_continue());
        }
    }

    #[test]
    fn unbounded_reducer_keeps_latest_offset_per_key() {
        let mut reducer = CompactionKeyReducer::default();
        run(&mut reducer, &[(b"a", 0), (b"b", 1), (b"a", 2), (b"c", 3), (b"b", 4)]);
        assert_eq!(reducer.evictions(), 0);

        let keep = reducer.finish().unwrap();
        assert_eq!(keep.to_string(), "{2,3,4}");
    }

    #[test]
    fn eviction_commits_offset_and_retracks_key() {
        // Room for one key at a time.
        let mut reducer = CompactionKeyReducer::new(CompactionKeyReducer::entry_cost(1));
        run(&mut reducer, &[(b"a", 0), (b"a", 1), (b"b", 2), (b"a", 3)]);
        assert_eq!(reducer.evictions(), 2);

        // a@1 evicted by b, b@2 evicted by a, a@3 flushed at finish.
        let keep = reducer.finish().unwrap();
        assert_eq!(keep.to_string(), "{1,2,3}");
    }

    #[test]
    fn key_larger_than_budget_is_still_tracked() {
        let mut reducer = CompactionKeyReducer::new(1);
        run(&mut reducer, &[(b"big-key", 5), (b"big-key", 6)]);
        assert_eq!(reducer.finish().unwrap().to_string(), "{6}");
    }

    #[test]
    fn offset_list_reducer_respects_base() {
        let mut reducer = OffsetListReducer::new(Offset::new(2));
        for offset in 0..5 {
            assert!(reducer.reduce(entry(b"k", offset)).unwrap().is_continue());
        }
        let list = reducer.finish().unwrap();
        assert_eq!(list.to_string(), "base 2 {2,3,4}");
    }
}
