//! Append-only compaction index writer.

use std::fmt::{self, Display};

use tidelog_io::IndexFile;
use tidelog_types::{BatchKind, Offset};
use tracing::{debug, info, warn};

use crate::spill::SpillKeyIndex;
use crate::{Entry, Footer, IndexError, MAX_KEY_SIZE};

/// Default byte budget for keys buffered before they are spilled.
pub const DEFAULT_SPILL_BUDGET: usize = 512 * 1024;

/// Builds a compaction index for one segment.
///
/// Keys are indexed in offset order with [`IndexWriter::index`] and the file
/// is sealed with [`IndexWriter::close`], which appends the [`Footer`].
/// Nothing written to the file is ever rewritten.
///
/// # Example
///
/// ```
/// # use tidelog_index::{IndexWriter, IndexReader};
/// # use tidelog_io::MemFile;
/// # use tidelog_types::{BatchKind, Offset};
/// let file = MemFile::new("segment-0.compaction_index");
/// let store = file.store();
///
/// let mut writer = IndexWriter::new(file, 64 * 1024);
/// writer.index(BatchKind::new(1), b"user-42", Offset::new(0), 0)?;
/// let footer = writer.close()?;
/// assert_eq!(footer.keys, 1);
///
/// let mut reader = IndexReader::new(MemFile::with_store("segment-0.compaction_index", store));
/// assert_eq!(reader.load_footer()?, footer);
/// # Ok::<(), tidelog_index::IndexError>(())
/// ```
pub struct IndexWriter {
    spill: SpillKeyIndex,
    keys: u64,
    truncated: u64,
    /// Set once the footer is durable.
    closed: bool,
}

impl IndexWriter {
    /// Creates a writer appending to `file`, buffering at most `max_memory`
    /// bytes of keys.
    pub fn new(file: impl IndexFile + 'static, max_memory: usize) -> Self {
        Self {
            spill: SpillKeyIndex::new(Box::new(file), max_memory),
            keys: 0,
            truncated: 0,
            closed: false,
        }
    }

    /// Indexes `key` at `offset`/`delta` under batch kind `kind`.
    ///
    /// The stored key is the kind byte followed by `key`, cut to
    /// [`MAX_KEY_SIZE`] bytes.
    pub fn index(
        &mut self,
        kind: BatchKind,
        key: &[u8],
        offset: Offset,
        delta: u32,
    ) -> Result<(), IndexError> {
        if key.len() >= MAX_KEY_SIZE {
            debug!(
                file = self.spill.name(),
                %offset,
                key_len = key.len(),
                max = MAX_KEY_SIZE,
                "truncating oversized key"
            );
            self.truncated += 1;
        }
        let entry = Entry::with_prefixed_key(kind, key, offset, delta);
        self.spill.put(entry)?;
        self.keys += 1;
        Ok(())
    }

    /// Flushes pending keys, appends the footer and syncs the file.
    ///
    /// Returns the footer that was written. On error the file has no valid
    /// footer and must be discarded.
    pub fn close(mut self) -> Result<Footer, IndexError> {
        let spill = &mut self.spill;
        spill.flush_all()?;
        debug_assert_eq!(spill.entries_written(), self.keys);

        let footer = Footer::new(self.keys, spill.bytes_written(), spill.checksum());
        let file = spill.file_mut();
        file.append(&footer.to_bytes())?;
        file.sync()?;

        info!(
            file = spill.name(),
            keys = footer.keys,
            size = footer.size,
            crc = format_args!("{:#010x}", footer.crc),
            truncated = self.truncated,
            "compaction index closed"
        );
        self.closed = true;
        Ok(footer)
    }

    /// Number of keys indexed so far.
    pub fn keys(&self) -> u64 {
        self.keys
    }

    /// Bytes of memory currently held by buffered keys.
    pub fn memory_used(&self) -> usize {
        self.spill.memory_used()
    }
}

impl Display for IndexWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{file: {}, keys: {}, spilled: {} bytes, memory: {}/{} bytes}}",
            self.spill.name(),
            self.keys,
            self.spill.bytes_written(),
            self.spill.memory_used(),
            self.spill.budget()
        )
    }
}

impl fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexWriter")
            .field("spill", &self.spill)
            .field("keys", &self.keys)
            .field("truncated", &self.truncated)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                file = self.spill.name(),
                keys = self.keys,
                pending = self.spill.pending(),
                "compaction index dropped without close; file has no footer"
            );
        }
    }
}
