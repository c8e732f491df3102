//! Error types for the compaction index.

use std::time::Duration;

use tidelog_io::IoError;

/// Malformed or truncated bytes in an index file.
///
/// A format error is fatal for the decode that hit it. The file is unusable
/// past that point and the operation is never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The byte stream ended in the middle of a frame.
    #[error("unexpected end of data: needed {needed} bytes, {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// A frame's declared length disagrees with what its fields consume.
    #[error("frame declares {declared} bytes but its fields need at least {consumed}")]
    FrameLengthMismatch { declared: usize, consumed: usize },

    /// A varint ran past ten bytes or overflowed 64 bits.
    #[error("malformed varint")]
    VarintOverflow,

    /// A decoded delta does not fit the delta range.
    #[error("delta {0} out of range")]
    DeltaOutOfRange(i64),

    /// A key too long for the frame was handed to the encoder.
    #[error("key of {len} bytes exceeds maximum of {max}")]
    KeyTooLong { len: usize, max: usize },

    /// The footer region is shorter than the fixed footer size.
    #[error("footer truncated: expected {expected} bytes, found {actual}")]
    FooterTruncated { expected: usize, actual: usize },

    /// The footer carries a version this build does not understand.
    #[error("unsupported index format version {0}")]
    UnsupportedVersion(u8),

    /// The footer's declared entry region does not match the file size.
    #[error("footer declares {declared} entry bytes but file holds {actual}")]
    RegionSizeMismatch { declared: u64, actual: u64 },

    /// A full pass decoded a different number of entries than the footer declares.
    #[error("footer declares {declared} entries but {decoded} were decoded")]
    KeyCountMismatch { declared: u64, decoded: u64 },
}

/// Errors surfaced by index writers, readers and reducers.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("format error in {name}: {source}")]
    Format {
        name: String,
        #[source]
        source: FormatError,
    },

    /// The checksum stored in the footer does not match the entry region.
    ///
    /// The entries can still be decoded, but must not drive compaction.
    #[error("integrity check failed for {name}: footer crc {expected:#010x}, computed {actual:#010x}")]
    Integrity {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error(transparent)]
    Io(#[from] IoError),

    /// The consume deadline passed before the pass finished.
    ///
    /// The reader stays on an entry boundary; `reset` and retry is safe.
    #[error("consume deadline exceeded after {decoded} entries ({elapsed:?} elapsed)")]
    Timeout { decoded: u64, elapsed: Duration },
}

impl IndexError {
    pub(crate) fn format(name: &str, source: FormatError) -> Self {
        Self::Format {
            name: name.to_string(),
            source,
        }
    }

    /// Returns true for errors that make the file unusable.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}
