//! In-memory index file.
//!
//! A [`MemFile`] is a view over a [`MemStore`], a reference-counted byte
//! buffer. Several files may share one store: a writer fills it, and any
//! number of readers opened afterwards see the same bytes. This is how tests
//! and tools build an index without touching the filesystem.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{IndexFile, IoError};

/// Shared backing bytes for one or more [`MemFile`]s.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `bytes`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(bytes.into())),
        }
    }

    /// Returns a copy of the current contents.
    pub fn to_vec(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Returns the number of bytes stored.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Applies `f` to the stored bytes, e.g. to corrupt them in a test.
    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // A panic while holding the lock cannot leave a Vec<u8> half-updated.
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An [`IndexFile`] backed by a [`MemStore`].
#[derive(Debug, Clone)]
pub struct MemFile {
    name: String,
    store: MemStore,
}

impl MemFile {
    /// Creates a file over a fresh, empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_store(name, MemStore::new())
    }

    /// Creates a file over an existing store.
    pub fn with_store(name: impl Into<String>, store: MemStore) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Returns a handle to the backing store.
    pub fn store(&self) -> MemStore {
        self.store.clone()
    }
}

impl IndexFile for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, buf: &[u8]) -> Result<(), IoError> {
        self.store.lock().extend_from_slice(buf);
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, IoError> {
        let bytes = self.store.lock();
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= bytes.len() {
            return Ok(0);
        }
        let n = buf.len().min(bytes.len() - start);
        buf[..n].copy_from_slice(&bytes[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> Result<u64, IoError> {
        Ok(self.store.len() as u64)
    }

    fn truncate(&mut self, len: u64) -> Result<(), IoError> {
        let len = usize::try_from(len).map_err(std::io::Error::other)?;
        self.store.lock().resize(len, 0);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}
