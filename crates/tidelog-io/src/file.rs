//! The [`IndexFile`] trait.
//!
//! An index file is a named byte sequence that is appended to while an index
//! is written and read at arbitrary positions once it is closed. Writers never
//! seek backwards: every byte that reaches the file is appended.

use crate::IoError;

/// Abstraction over the file backing one compaction index.
///
/// Implementations must be `Send` so that independent indexes can be driven
/// from different threads. A single instance is not shared between threads;
/// callers serialize access through `&mut self`.
pub trait IndexFile: Send {
    /// Human readable name used in logs and error messages.
    fn name(&self) -> &str;

    /// Appends `buf` to the end of the file.
    fn append(&mut self, buf: &[u8]) -> Result<(), IoError>;

    /// Reads into `buf` starting at byte `offset`.
    ///
    /// Returns the number of bytes read, which is smaller than `buf.len()`
    /// only when end-of-file is reached.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, IoError>;

    /// Returns the current file size in bytes.
    fn size(&self) -> Result<u64, IoError>;

    /// Shrinks (or zero-extends) the file to `len` bytes.
    fn truncate(&mut self, len: u64) -> Result<(), IoError>;

    /// Flushes written data to durable storage.
    fn sync(&mut self) -> Result<(), IoError>;

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnexpectedEof`] if the file ends first.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), IoError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                return Err(IoError::UnexpectedEof {
                    name: self.name().to_string(),
                    offset,
                    wanted: buf.len(),
                    got: filled,
                });
            }
            filled += n;
        }
        Ok(())
    }
}

impl<F: IndexFile + ?Sized> IndexFile for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn append(&mut self, buf: &[u8]) -> Result<(), IoError> {
        (**self).append(buf)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, IoError> {
        (**self).read_at(offset, buf)
    }

    fn size(&self) -> Result<u64, IoError> {
        (**self).size()
    }

    fn truncate(&mut self, len: u64) -> Result<(), IoError> {
        (**self).truncate(len)
    }

    fn sync(&mut self) -> Result<(), IoError> {
        (**self).sync()
    }
}
