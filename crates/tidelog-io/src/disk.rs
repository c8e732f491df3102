//! `std::fs` backed index file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{IndexFile, IoError};

/// An index file on the local filesystem.
///
/// Created with [`DiskFile::create`] for writing a new index, or
/// [`DiskFile::open`] for reading a closed one. Appends always land at the end
/// of the file regardless of prior reads.
#[derive(Debug)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
    file: File,
    writable: bool,
}

impl DiskFile {
    /// Creates (or truncates) the file at `path` for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self::wrap(path, file, true))
    }

    /// Opens an existing file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(IoError::NotFound { path });
        }
        let file = OpenOptions::new().read(true).open(&path)?;
        Ok(Self::wrap(path, file, false))
    }

    fn wrap(path: PathBuf, file: File, writable: bool) -> Self {
        let name = path.display().to_string();
        Self {
            path,
            name,
            file,
            writable,
        }
    }

    /// Returns the path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_writable(&self) -> Result<(), IoError> {
        if self.writable {
            Ok(())
        } else {
            Err(IoError::ReadOnly {
                name: self.name.clone(),
            })
        }
    }
}

impl IndexFile for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, buf: &[u8]) -> Result<(), IoError> {
        self.ensure_writable()?;
        // Reads are positional, so the cursor only ever moves through writes.
        let end = self.file.metadata()?.len();
        write_at_end(&mut self.file, end, buf)?;
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, IoError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            let n = self.file.read_at(buf, offset)?;
            Ok(n)
        }

        #[cfg(not(unix))]
        {
            use std::os::windows::fs::FileExt;
            let n = self.file.seek_read(buf, offset)?;
            Ok(n)
        }
    }

    fn size(&self) -> Result<u64, IoError> {
        Ok(self.file.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> Result<(), IoError> {
        self.ensure_writable()?;
        self.file.set_len(len)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), IoError> {
        self.ensure_writable()?;
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

fn write_at_end(file: &mut File, end: u64, buf: &[u8]) -> std::io::Result<()> {
    use std::io::{Seek, SeekFrom};
    file.seek(SeekFrom::Start(end))?;
    file.write_all(buf)
}
