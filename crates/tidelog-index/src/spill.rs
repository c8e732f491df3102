//! Memory-bounded key buffer that spills entries to the index file.
//!
//! Entries are buffered in arrival order while they fit in the byte budget.
//! When a new entry would push the buffer over budget, the oldest entries are
//! encoded and appended to the backing file until it fits again. Nothing is
//! deduplicated here: every entry reaches the file exactly once and in the
//! order it arrived. Removing superseded keys is the reducers' job.

use std::collections::VecDeque;
use std::mem::size_of;

use tidelog_io::IndexFile;

use crate::{Entry, IndexError};

/// Fixed bookkeeping cost charged for every buffered entry on top of its key.
pub const ENTRY_OVERHEAD: usize = size_of::<Entry>();

/// Bounded buffer of pending entries in front of an [`IndexFile`].
///
/// # Invariants
///
/// - `used` equals the sum of [`SpillKeyIndex::entry_cost`] over `pending`
/// - `used <= budget` whenever more than one entry is pending
/// - bytes reach the file in arrival order and are never rewritten
pub struct SpillKeyIndex {
    file: Box<dyn IndexFile>,
    budget: usize,
    used: usize,
    pending: VecDeque<Entry>,
    /// Scratch buffer reused for each batch of evictions.
    spill_buf: Vec<u8>,
    crc: crc32fast::Hasher,
    bytes_written: u64,
    entries_written: u64,
}

impl SpillKeyIndex {
    /// Creates a buffer in front of `file` holding at most `budget` bytes.
    pub fn new(file: Box<dyn IndexFile>, budget: usize) -> Self {
        Self {
            file,
            budget,
            used: 0,
            pending: VecDeque::new(),
            spill_buf: Vec::new(),
            crc: crc32fast::Hasher::new(),
            bytes_written: 0,
            entries_written: 0,
        }
    }

    /// Memory charged for buffering `entry`.
    pub fn entry_cost(entry: &Entry) -> usize {
        entry.key.len() + ENTRY_OVERHEAD
    }

    /// Buffers `entry`, spilling the oldest pending entries first if needed.
    ///
    /// An entry larger than the whole budget is still accepted into an empty
    /// buffer; it is spilled by the next call or by [`SpillKeyIndex::flush_all`].
    pub fn put(&mut self, entry: Entry) -> Result<(), IndexError> {
        let cost = Self::entry_cost(&entry);
        let mut evicted = 0usize;
        while self.used + cost > self.budget {
            let Some(oldest) = self.pending.pop_front() else {
                break;
            };
            self.used -= Self::entry_cost(&oldest);
            self.encode(&oldest)?;
            evicted += 1;
        }
        if evicted > 0 {
            tracing::debug!(
                file = self.file.name(),
                evicted,
                pending = self.pending.len(),
                used = self.used,
                budget = self.budget,
                "spilled keys to make room"
            );
            self.write_spilled()?;
        }

        self.used += cost;
        self.pending.push_back(entry);
        Ok(())
    }

    /// Spills every pending entry, oldest first.
    pub fn flush_all(&mut self) -> Result<(), IndexError> {
        while let Some(entry) = self.pending.pop_front() {
            self.encode(&entry)?;
        }
        self.used = 0;
        self.write_spilled()
    }

    fn encode(&mut self, entry: &Entry) -> Result<(), IndexError> {
        entry
            .write_into(&mut self.spill_buf)
            .map_err(|e| IndexError::format(self.file.name(), e))?;
        self.entries_written += 1;
        Ok(())
    }

    fn write_spilled(&mut self) -> Result<(), IndexError> {
        if self.spill_buf.is_empty() {
            return Ok(());
        }
        self.file.append(&self.spill_buf)?;
        self.crc.update(&self.spill_buf);
        self.bytes_written += self.spill_buf.len() as u64;
        self.spill_buf.clear();
        Ok(())
    }

    /// Bytes of the entry region written to the file so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Entries encoded to the file so far.
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// CRC32 of every byte written so far.
    pub fn checksum(&self) -> u32 {
        self.crc.clone().finalize()
    }

    /// Memory currently charged against the budget.
    pub fn memory_used(&self) -> usize {
        self.used
    }

    /// Entries currently buffered.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn name(&self) -> &str {
        self.file.name()
    }

    /// Gives mutable access to the backing file once everything is spilled.
    pub(crate) fn file_mut(&mut self) -> &mut dyn IndexFile {
        debug_assert!(self.pending.is_empty(), "file handed out with entries pending");
        self.file.as_mut()
    }
}

impl std::fmt::Debug for SpillKeyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpillKeyIndex")
            .field("file", &self.file.name())
            .field("budget", &self.budget)
            .field("used", &self.used)
            .field("pending", &self.pending.len())
            .field("bytes_written", &self.bytes_written)
            .field("entries_written", &self.entries_written)
            .finish()
    }
}
