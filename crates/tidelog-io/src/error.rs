//! I/O error types.

use std::path::PathBuf;

/// Errors from a backing index file.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Underlying OS I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// File not found.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// A positional read hit end-of-file before filling the buffer.
    #[error("{name}: short read at offset {offset}: wanted {wanted} bytes, got {got}")]
    UnexpectedEof {
        name: String,
        offset: u64,
        wanted: usize,
        got: usize,
    },

    /// A mutating call was made on a file opened for reading only.
    #[error("{name}: file is open read-only")]
    ReadOnly { name: String },
}
