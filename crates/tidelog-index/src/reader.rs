//! Streaming compaction index reader.
//!
//! The reader walks the entry region front to back through a bounded buffer,
//! so memory use does not depend on the index size. Entries are decoded one at
//! a time and either pulled through [`IndexReader::entries`] or pushed into a
//! [`Reducer`] by [`IndexReader::consume`].

use std::fmt;
use std::ops::ControlFlow;
use std::time::Instant;

use bytes::BytesMut;
use tidelog_io::IndexFile;
use tracing::{debug, warn};

use crate::entry::LENGTH_PREFIX_SIZE;
use crate::{Entry, FOOTER_SIZE, Footer, FormatError, IndexError, Reducer};

/// Default number of bytes fetched from the file per read.
pub const DEFAULT_READ_BUFFER: usize = 32 * 1024;

/// Reads a closed compaction index.
///
/// The footer is loaded lazily by the first operation that needs it and
/// cached afterwards. A reader keeps a single cursor; [`IndexReader::reset`]
/// moves it back to the first entry.
pub struct IndexReader {
    file: Box<dyn IndexFile>,
    buffer_size: usize,
    footer: Option<Footer>,
    /// File position of the next read.
    read_pos: u64,
    /// Bytes read from the file but not yet decoded.
    buffer: BytesMut,
    /// Entries decoded since the last reset.
    decoded: u64,
}

impl IndexReader {
    /// Opens a reader over `file` with the default read buffer.
    pub fn new(file: impl IndexFile + 'static) -> Self {
        Self::with_buffer_size(file, DEFAULT_READ_BUFFER)
    }

    /// Opens a reader over `file` fetching `buffer_size` bytes per read.
    pub fn with_buffer_size(file: impl IndexFile + 'static, buffer_size: usize) -> Self {
        Self {
            file: Box::new(file),
            buffer_size: buffer_size.max(1),
            footer: None,
            read_pos: 0,
            buffer: BytesMut::new(),
            decoded: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.file.name()
    }

    /// The cached footer, if it has been loaded.
    pub fn footer(&self) -> Option<Footer> {
        self.footer
    }

    /// Entries decoded since the last reset.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Reads, validates and caches the footer.
    ///
    /// The checksum is not verified here; see [`IndexReader::verify_integrity`].
    ///
    /// # Errors
    ///
    /// - [`FormatError::FooterTruncated`] if the file is shorter than a footer
    /// - [`FormatError::UnsupportedVersion`] for an unknown version byte
    /// - [`FormatError::RegionSizeMismatch`] if the footer's size field does
    ///   not account for the rest of the file
    pub fn load_footer(&mut self) -> Result<Footer, IndexError> {
        if let Some(footer) = self.footer {
            return Ok(footer);
        }

        let file_size = self.file.size()?;
        if file_size < FOOTER_SIZE as u64 {
            return Err(self.format_error(FormatError::FooterTruncated {
                expected: FOOTER_SIZE,
                actual: usize::try_from(file_size).unwrap_or(usize::MAX),
            }));
        }

        let region = file_size - FOOTER_SIZE as u64;
        let mut raw = [0u8; FOOTER_SIZE];
        self.file.read_exact_at(region, &mut raw)?;
        let footer = Footer::from_bytes(&raw).map_err(|e| self.format_error(e))?;

        if footer.size != region {
            return Err(self.format_error(FormatError::RegionSizeMismatch {
                declared: footer.size,
                actual: region,
            }));
        }

        debug!(file = self.file.name(), %footer, "loaded compaction index footer");
        self.footer = Some(footer);
        Ok(footer)
    }

    /// Recomputes the entry region checksum and compares it with the footer.
    ///
    /// Leaves the cursor where it was.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Integrity`] on a mismatch. The entries may still
    /// decode, but must not be trusted.
    pub fn verify_integrity(&mut self) -> Result<(), IndexError> {
        let footer = self.load_footer()?;

        let mut hasher = crc32fast::Hasher::new();
        let mut chunk = vec![0u8; self.buffer_size];
        let mut pos = 0u64;
        while pos < footer.size {
            let len = usize::try_from(footer.size - pos)
                .map_or(chunk.len(), |remaining| remaining.min(chunk.len()));
            self.file.read_exact_at(pos, &mut chunk[..len])?;
            hasher.update(&chunk[..len]);
            pos += len as u64;
        }

        let actual = hasher.finalize();
        if actual != footer.crc {
            warn!(
                file = self.file.name(),
                expected = format_args!("{:#010x}", footer.crc),
                actual = format_args!("{actual:#010x}"),
                "compaction index checksum mismatch"
            );
            return Err(IndexError::Integrity {
                name: self.file.name().to_string(),
                expected: footer.crc,
                actual,
            });
        }
        Ok(())
    }

    /// Feeds entries from the cursor onwards into `reducer` and returns its
    /// output.
    ///
    /// Stops at the end of the entry region or when the reducer breaks. If
    /// `deadline` passes first, returns [`IndexError::Timeout`] with the
    /// cursor on an entry boundary; [`IndexReader::reset`] and retry with a
    /// fresh reducer.
    pub fn consume<R: Reducer>(
        &mut self,
        mut reducer: R,
        deadline: Option<Instant>,
    ) -> Result<R::Output, IndexError> {
        self.load_footer()?;
        let started = Instant::now();

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(IndexError::Timeout {
                    decoded: self.decoded,
                    elapsed: started.elapsed(),
                });
            }
            let Some(entry) = self.next_entry()? else {
                break;
            };
            if let ControlFlow::Break(()) = reducer.reduce(entry)? {
                break;
            }
        }

        reducer.finish()
    }

    /// Iterates entries from the cursor onwards.
    pub fn entries(&mut self) -> EntryIter<'_> {
        EntryIter {
            reader: self,
            done: false,
        }
    }

    /// Moves the cursor back to the first entry. The cached footer is kept.
    pub fn reset(&mut self) {
        self.read_pos = 0;
        self.buffer.clear();
        self.decoded = 0;
    }

    /// Releases the backing file.
    pub fn close(self) {
        debug!(
            file = self.file.name(),
            decoded = self.decoded,
            "compaction index reader closed"
        );
    }

    /// Decodes the next entry, or returns `None` at the end of the region.
    ///
    /// At the end of a pass the number of decoded entries must equal the
    /// footer's key count.
    pub fn next_entry(&mut self) -> Result<Option<Entry>, IndexError> {
        let footer = self.load_footer()?;

        loop {
            if let Some(total) = Entry::peek_encoded_len(&self.buffer) {
                if self.buffer.len() >= total {
                    let frame = self.buffer.split_to(total).freeze();
                    let (entry, _) = Entry::from_bytes(&frame).map_err(|e| self.format_error(e))?;
                    self.decoded += 1;
                    return Ok(Some(entry));
                }
            }

            if self.read_pos >= footer.size {
                return self.finish_pass(footer).map(|()| None);
            }
            self.fill(footer.size)?;
        }
    }

    fn finish_pass(&self, footer: Footer) -> Result<(), IndexError> {
        if !self.buffer.is_empty() {
            let needed = Entry::peek_encoded_len(&self.buffer).unwrap_or(LENGTH_PREFIX_SIZE);
            return Err(self.format_error(FormatError::UnexpectedEof {
                needed,
                available: self.buffer.len(),
            }));
        }
        if self.decoded != footer.keys {
            return Err(self.format_error(FormatError::KeyCountMismatch {
                declared: footer.keys,
                decoded: self.decoded,
            }));
        }
        Ok(())
    }

    /// Appends up to one buffer's worth of the entry region to `buffer`.
    fn fill(&mut self, region_end: u64) -> Result<(), IndexError> {
        let len = usize::try_from(region_end - self.read_pos)
            .map_or(self.buffer_size, |remaining| remaining.min(self.buffer_size));
        let start = self.buffer.len();
        self.buffer.resize(start + len, 0);
        self.file
            .read_exact_at(self.read_pos, &mut self.buffer[start..])?;
        self.read_pos += len as u64;
        Ok(())
    }

    fn format_error(&self, source: FormatError) -> IndexError {
        IndexError::format(self.file.name(), source)
    }
}

impl fmt::Debug for IndexReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexReader")
            .field("file", &self.file.name())
            .field("footer", &self.footer)
            .field("read_pos", &self.read_pos)
            .field("buffered", &self.buffer.len())
            .field("decoded", &self.decoded)
            .finish()
    }
}

/// Iterator over the entries of an [`IndexReader`].
///
/// Yields at most one error, after which it is exhausted.
pub struct EntryIter<'a> {
    reader: &'a mut IndexReader,
    done: bool,
}

impl Iterator for EntryIter<'_> {
    type Item = Result<Entry, IndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexWriter;
    use test_case::test_case;
    use tidelog_io::{MemFile, MemStore};
    use tidelog_types::{BatchKind, Offset};

    fn build(n: u64) -> MemStore {
        let file = MemFile::new("reader");
        let store = file.store();
        let mut writer = IndexWriter::new(file, 256);
        for i in 0..n {
            writer
                .index(BatchKind::new(1), format!("key-{i}").as_bytes(), Offset::new(i), 0)
                .unwrap();
        }
        writer.close().unwrap();
        store
    }

    #[test_case(1; "one byte at a time")]
    #[test_case(7; "smaller than a frame")]
    #[test_case(DEFAULT_READ_BUFFER; "default")]
    fn decodes_every_entry_whatever_the_buffer_size(buffer_size: usize) {
        let store = build(50);
        let mut reader =
            IndexReader::with_buffer_size(MemFile::with_store("reader", store), buffer_size);

        let offsets: Vec<u64> = reader
            .entries()
            .map(|e| e.unwrap().offset.as_u64())
            .collect();
        assert_eq!(offsets, (0..50).collect::<Vec<_>>());
        assert_eq!(reader.decoded(), 50);
    }

    #[test]
    fn footer_is_cached_and_survives_reset() {
        let store = build(3);
        let mut reader = IndexReader::new(MemFile::with_store("reader", store));
        assert_eq!(reader.footer(), None);

        let footer = reader.load_footer().unwrap();
        assert_eq!(footer.keys, 3);
        assert_eq!(reader.entries().count(), 3);

        reader.reset();
        assert_eq!(reader.footer(), Some(footer));
        assert_eq!(reader.entries().count(), 3);
    }

    #[test]
    fn short_file_is_footer_truncated() {
        let store = MemStore::from_bytes(vec![1u8; FOOTER_SIZE - 1]);
        let mut reader = IndexReader::new(MemFile::with_store("short", store));
        let err = reader.load_footer().unwrap_err();
        assert!(matches!(
            err,
            IndexError::Format {
                source: FormatError::FooterTruncated { .. },
                ..
            }
        ));
    }

    #[test]
    fn prepended_bytes_are_region_size_mismatch() {
        let store = build(2);
        store.with_bytes_mut(|bytes| bytes.splice(0..0, [0u8; 4]).for_each(drop));
        let mut reader = IndexReader::new(MemFile::with_store("shifted", store));
        let err = reader.load_footer().unwrap_err();
        assert!(matches!(
            err,
            IndexError::Format {
                source: FormatError::RegionSizeMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn wrong_key_count_is_detected_at_end_of_pass() {
        let store = build(2);
        store.with_bytes_mut(|bytes| {
            let keys_at = bytes.len() - FOOTER_SIZE + 1;
            bytes[keys_at..keys_at + 8].copy_from_slice(&3u64.to_le_bytes());
        });
        let mut reader = IndexReader::new(MemFile::with_store("miscounted", store));
        let results: Vec<_> = reader.entries().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(
            results[2],
            Err(IndexError::Format {
                source: FormatError::KeyCountMismatch {
                    declared: 3,
                    decoded: 2
                },
                ..
            })
        ));
    }

    #[test]
    fn verify_integrity_does_not_move_the_cursor() {
        let store = build(10);
        let mut reader = IndexReader::with_buffer_size(MemFile::with_store("reader", store), 5);
        let mut entries = reader.entries();
        entries.next().unwrap().unwrap();
        drop(entries);

        reader.verify_integrity().unwrap();
        assert_eq!(reader.entries().count(), 9);
    }
}
