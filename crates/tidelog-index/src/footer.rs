//! Trailing summary record of a compaction index.
//!
//! # Footer Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │  Offset  │  Size  │  Description                │
//! ├─────────────────────────────────────────────────┤
//! │  0       │  1     │  Format version             │
//! │  1       │  8     │  Entry count (u64 LE)       │
//! │  9       │  8     │  Entry region size (u64 LE) │
//! │  17      │  4     │  CRC32 of entry region      │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! The footer always occupies the last [`FOOTER_SIZE`] bytes of the file.

use std::fmt::{self, Display};

use crate::FormatError;

const VERSION_SIZE: usize = 1;
const KEYS_SIZE: usize = 8; // u64
const SIZE_SIZE: usize = 8; // u64
const CRC_SIZE: usize = 4; // u32

/// Fixed byte length of an encoded footer.
pub const FOOTER_SIZE: usize = VERSION_SIZE + KEYS_SIZE + SIZE_SIZE + CRC_SIZE;

/// On-disk format version of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FormatVersion {
    /// Every stored key starts with its batch kind byte.
    KeyPrefixedWithBatchKind = 1,
}

impl FormatVersion {
    /// Version written by this build.
    pub const CURRENT: Self = Self::KeyPrefixedWithBatchKind;

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::KeyPrefixedWithBatchKind),
            _ => None,
        }
    }
}

impl Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyPrefixedWithBatchKind => write!(f, "key_prefixed_with_batch_kind"),
        }
    }
}

/// Summary of an index body, written once when the writer closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Footer {
    pub version: FormatVersion,
    /// Number of entries in the body.
    pub keys: u64,
    /// Byte length of the entry region, footer excluded.
    pub size: u64,
    /// CRC32 of the entry region.
    pub crc: u32,
}

impl Footer {
    /// Creates a footer in the current format version.
    pub fn new(keys: u64, size: u64, crc: u32) -> Self {
        Self {
            version: FormatVersion::CURRENT,
            keys,
            size,
            crc,
        }
    }

    /// Serializes the footer.
    pub fn to_bytes(&self) -> [u8; FOOTER_SIZE] {
        let mut buf = [0u8; FOOTER_SIZE];
        let (version, rest) = buf.split_at_mut(VERSION_SIZE);
        let (keys, rest) = rest.split_at_mut(KEYS_SIZE);
        let (size, crc) = rest.split_at_mut(SIZE_SIZE);

        version[0] = self.version.as_byte();
        keys.copy_from_slice(&self.keys.to_le_bytes());
        size.copy_from_slice(&self.size.to_le_bytes());
        crc.copy_from_slice(&self.crc.to_le_bytes());
        buf
    }

    /// Deserializes a footer from exactly [`FOOTER_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// - [`FormatError::FooterTruncated`] if `data` has the wrong length
    /// - [`FormatError::UnsupportedVersion`] if the version byte is unknown
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let data: &[u8; FOOTER_SIZE] =
            data.try_into().map_err(|_| FormatError::FooterTruncated {
                expected: FOOTER_SIZE,
                actual: data.len(),
            })?;

        let version =
            FormatVersion::from_byte(data[0]).ok_or(FormatError::UnsupportedVersion(data[0]))?;

        let keys_start = VERSION_SIZE;
        let size_start = keys_start + KEYS_SIZE;
        let crc_start = size_start + SIZE_SIZE;

        let keys = u64::from_le_bytes(
            data[keys_start..size_start]
                .try_into()
                .expect("slice length equals KEYS_SIZE"),
        );
        let size = u64::from_le_bytes(
            data[size_start..crc_start]
                .try_into()
                .expect("slice length equals SIZE_SIZE"),
        );
        let crc = u32::from_le_bytes(
            data[crc_start..]
                .try_into()
                .expect("slice length equals CRC_SIZE"),
        );

        Ok(Self {
            version,
            keys,
            size,
            crc,
        })
    }
}

impl Display for Footer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{version: {}, keys: {}, size: {}, crc: {:#010x}}}",
            self.version, self.keys, self.size, self.crc
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn footer_is_21_bytes() {
        assert_eq!(FOOTER_SIZE, 21);
    }

    #[test]
    fn roundtrip() {
        let footer = Footer::new(3, 1031, 0xDEAD_BEEF);
        assert_eq!(Footer::from_bytes(&footer.to_bytes()).unwrap(), footer);
    }

    #[test]
    fn layout_is_little_endian() {
        let bytes = Footer::new(1, 2, 3).to_bytes();
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..9], &1u64.to_le_bytes());
        assert_eq!(&bytes[9..17], &2u64.to_le_bytes());
        assert_eq!(&bytes[17..21], &3u32.to_le_bytes());
    }

    #[test_case(0; "empty")]
    #[test_case(FOOTER_SIZE - 1; "one short")]
    #[test_case(FOOTER_SIZE + 1; "one long")]
    fn wrong_length_is_truncated(len: usize) {
        let data = vec![1u8; len];
        assert_eq!(
            Footer::from_bytes(&data),
            Err(FormatError::FooterTruncated {
                expected: FOOTER_SIZE,
                actual: len
            })
        );
    }

    #[test_case(0; "zero")]
    #[test_case(2; "future")]
    #[test_case(0xFF; "garbage")]
    fn unknown_version_is_rejected(version: u8) {
        let mut bytes = Footer::new(0, 0, 0).to_bytes();
        bytes[0] = version;
        assert_eq!(
            Footer::from_bytes(&bytes),
            Err(FormatError::UnsupportedVersion(version))
        );
    }

    #[test]
    fn display_shows_fields() {
        let footer = Footer::new(1, 1031, 0x1234);
        assert_eq!(
            footer.to_string(),
            "{version: key_prefixed_with_batch_kind, keys: 1, size: 1031, crc: 0x00001234}"
        );
    }
}
