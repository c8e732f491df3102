//! Index entry and its on-disk frame.
//!
//! # Entry Format
//!
//! ```text
//! [length:u16][discriminator:u8][offset:varint][delta:varint][key:bytes]
//!      2B             1B            1-10B          1-10B       variable
//! ```
//!
//! `length` counts every byte after the length field itself and must fit in a
//! `u16`. The key length is implied: `length - 1 - len(offset) - len(delta)`.
//!
//! The frame treats the key as opaque. By convention the writer stores the
//! discriminator byte in front of the caller's key (see [`Entry::raw_key`]),
//! so keys from different batch kinds never collide.

use bytes::Bytes;
use tidelog_types::{BatchKind, Offset};

use crate::{FormatError, vint};

/// Size of the frame length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest value the frame length prefix can hold.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Discriminator byte carried in every frame.
const DISCRIMINATOR_SIZE: usize = 1;

/// Longest key a frame can carry, whatever its offset and delta.
///
/// Reserving the worst-case varint width for both offset and delta makes this
/// a format constant rather than a function of the values being written.
pub const MAX_KEY_SIZE: usize = MAX_FRAME_SIZE - DISCRIMINATOR_SIZE - 2 * vint::MAX_LENGTH;

/// One decoded index entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Batch kind the key was indexed under.
    pub discriminator: BatchKind,
    /// Offset of the record within the segment.
    pub offset: Offset,
    /// Position of the record within its batch.
    pub delta: u32,
    /// Stored key: the discriminator byte followed by the raw key.
    pub key: Bytes,
}

impl Entry {
    /// Builds an entry whose stored key is `discriminator` followed by `raw_key`.
    ///
    /// The stored key is cut at [`MAX_KEY_SIZE`] bytes. The discriminator is
    /// always kept; only the tail of the raw key is lost.
    pub fn with_prefixed_key(
        discriminator: BatchKind,
        raw_key: &[u8],
        offset: Offset,
        delta: u32,
    ) -> Self {
        let raw_len = raw_key.len().min(MAX_KEY_SIZE - DISCRIMINATOR_SIZE);
        let mut key = Vec::with_capacity(DISCRIMINATOR_SIZE + raw_len);
        key.push(discriminator.as_byte());
        key.extend_from_slice(&raw_key[..raw_len]);
        Self {
            discriminator,
            offset,
            delta,
            key: Bytes::from(key),
        }
    }

    /// Returns the caller's key without the discriminator prefix.
    pub fn raw_key(&self) -> &[u8] {
        self.key.get(DISCRIMINATOR_SIZE..).unwrap_or_default()
    }

    /// Returns the number of bytes [`Entry::write_into`] appends.
    pub fn encoded_len(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.frame_len()
    }

    fn frame_len(&self) -> usize {
        DISCRIMINATOR_SIZE
            + vint::encoded_len(self.offset.as_i64_bits())
            + vint::encoded_len(i64::from(self.delta))
            + self.key.len()
    }

    /// Serializes the entry to a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_into(&mut buf)?;
        Ok(buf)
    }

    /// Appends the entry's frame to `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::KeyTooLong`] if the key exceeds [`MAX_KEY_SIZE`].
    /// Nothing is written in that case.
    pub fn write_into(&self, buf: &mut Vec<u8>) -> Result<(), FormatError> {
        if self.key.len() > MAX_KEY_SIZE {
            return Err(FormatError::KeyTooLong {
                len: self.key.len(),
                max: MAX_KEY_SIZE,
            });
        }
        let frame_len = self.frame_len();
        debug_assert!(frame_len <= MAX_FRAME_SIZE);

        let start = buf.len();
        buf.extend_from_slice(&(frame_len as u16).to_le_bytes());
        buf.push(self.discriminator.as_byte());
        vint::encode(self.offset.as_i64_bits(), buf);
        vint::encode(i64::from(self.delta), buf);
        buf.extend_from_slice(&self.key);

        debug_assert_eq!(buf.len() - start, LENGTH_PREFIX_SIZE + frame_len);
        Ok(())
    }

    /// Returns the total size of the frame at the front of `data`, if the
    /// length prefix is available.
    pub fn peek_encoded_len(data: &[u8]) -> Option<usize> {
        let prefix: [u8; LENGTH_PREFIX_SIZE] = data.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
        Some(LENGTH_PREFIX_SIZE + usize::from(u16::from_le_bytes(prefix)))
    }

    /// Deserializes the frame at the front of `data`.
    ///
    /// Returns the entry and the number of bytes consumed. The key is a
    /// zero-copy slice of `data`.
    ///
    /// # Errors
    ///
    /// - [`FormatError::UnexpectedEof`] if `data` ends mid-frame
    /// - [`FormatError::FrameLengthMismatch`] if the fields overrun the declared length
    /// - [`FormatError::VarintOverflow`] / [`FormatError::DeltaOutOfRange`] on bad varints
    pub fn from_bytes(data: &Bytes) -> Result<(Self, usize), FormatError> {
        let total = Self::peek_encoded_len(data).ok_or(FormatError::UnexpectedEof {
            needed: LENGTH_PREFIX_SIZE,
            available: data.len(),
        })?;
        if data.len() < total {
            return Err(FormatError::UnexpectedEof {
                needed: total,
                available: data.len(),
            });
        }
        let declared = total - LENGTH_PREFIX_SIZE;
        let frame = &data[LENGTH_PREFIX_SIZE..total];

        let mismatch = |consumed: usize| FormatError::FrameLengthMismatch { declared, consumed };

        let (&discriminator, rest) = frame.split_first().ok_or(mismatch(DISCRIMINATOR_SIZE))?;
        let mut pos = DISCRIMINATOR_SIZE;

        let (offset, n) = vint::decode(rest).map_err(|e| match e {
            FormatError::UnexpectedEof { .. } => mismatch(pos + rest.len() + 1),
            other => other,
        })?;
        pos += n;

        let (delta, n) = vint::decode(&frame[pos..]).map_err(|e| match e {
            FormatError::UnexpectedEof { .. } => mismatch(declared + 1),
            other => other,
        })?;
        pos += n;
        let delta = u32::try_from(delta).map_err(|_| FormatError::DeltaOutOfRange(delta))?;

        let key_start = LENGTH_PREFIX_SIZE + pos;
        Ok((
            Self {
                discriminator: BatchKind::new(discriminator),
                offset: Offset::from_i64_bits(offset),
                delta,
                key: data.slice(key_start..total),
            },
            total,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn max_key_size_reserves_worst_case_varints() {
        assert_eq!(MAX_KEY_SIZE, 65_535 - 1 - 20);

        let worst = Entry {
            discriminator: BatchKind::new(u8::MAX),
            offset: Offset::new(u64::MAX / 2 + 1),
            delta: u32::MAX,
            key: Bytes::from(vec![0u8; MAX_KEY_SIZE]),
        };
        // u32::MAX does not reach the 10 byte worst case, so the frame fits.
        assert!(worst.frame_len() <= MAX_FRAME_SIZE);
        assert!(worst.to_bytes().is_ok());
    }

    #[test]
    fn frame_layout_matches_format() {
        let entry = Entry::with_prefixed_key(BatchKind::new(3), b"abc", Offset::new(42), 66);
        let bytes = entry.to_bytes().unwrap();

        // length(2) + disc(1) + offset(1) + delta(2) + key(1 + 3)
        assert_eq!(bytes.len(), 10);
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 8);
        assert_eq!(bytes[2], 3);
        assert_eq!(bytes[3], 84); // zig-zag(42)
        assert_eq!(&bytes[4..6], &[0x84, 0x01]); // zig-zag(66) = 132
        assert_eq!(bytes[6], 3); // discriminator prefix
        assert_eq!(&bytes[7..], b"abc");
    }

    #[test]
    fn prefixed_key_is_truncated_to_max() {
        let raw = vec![7u8; MAX_KEY_SIZE + 100];
        let entry = Entry::with_prefixed_key(BatchKind::new(1), &raw, Offset::new(42), 66);
        assert_eq!(entry.key.len(), MAX_KEY_SIZE);
        assert_eq!(entry.key[0], 1);
        assert_eq!(entry.raw_key(), &raw[..MAX_KEY_SIZE - 1]);
        assert_eq!(entry.offset, Offset::new(42));
        assert_eq!(entry.delta, 66);
    }

    #[test]
    fn key_too_long_is_rejected_by_encoder() {
        let entry = Entry {
            discriminator: BatchKind::new(0),
            offset: Offset::ZERO,
            delta: 0,
            key: Bytes::from(vec![0u8; MAX_KEY_SIZE + 1]),
        };
        let mut buf = Vec::new();
        assert_eq!(
            entry.write_into(&mut buf),
            Err(FormatError::KeyTooLong {
                len: MAX_KEY_SIZE + 1,
                max: MAX_KEY_SIZE
            })
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn truncated_frame_is_eof() {
        let entry = Entry::with_prefixed_key(BatchKind::new(0), b"hello", Offset::new(9), 1);
        let bytes = entry.to_bytes().unwrap();
        for cut in 0..bytes.len() {
            let err = Entry::from_bytes(&Bytes::copy_from_slice(&bytes[..cut])).unwrap_err();
            assert!(matches!(err, FormatError::UnexpectedEof { .. }), "cut at {cut}");
        }
    }

    #[test]
    fn empty_frame_is_length_mismatch() {
        let data = Bytes::from_static(&[0, 0]);
        assert!(matches!(
            Entry::from_bytes(&data),
            Err(FormatError::FrameLengthMismatch { declared: 0, .. })
        ));
    }

    #[test]
    fn varint_running_past_frame_is_length_mismatch() {
        // length 2: discriminator + one continuation byte with nothing after it
        let data = Bytes::from_static(&[2, 0, 5, 0x80, 0x01]);
        assert!(matches!(
            Entry::from_bytes(&data),
            Err(FormatError::FrameLengthMismatch { declared: 2, .. })
        ));
    }

    #[test]
    fn negative_delta_is_rejected() {
        let mut frame = vec![5u8];
        vint::encode(10, &mut frame);
        vint::encode(-1, &mut frame);
        let mut data = (frame.len() as u16).to_le_bytes().to_vec();
        data.extend_from_slice(&frame);
        assert_eq!(
            Entry::from_bytes(&Bytes::from(data)),
            Err(FormatError::DeltaOutOfRange(-1))
        );
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            kind: u8,
            offset: u64,
            delta: u32,
            raw_key in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let entry = Entry::with_prefixed_key(BatchKind::new(kind), &raw_key, Offset::new(offset), delta);
            let bytes = Bytes::from(entry.to_bytes().unwrap());
            let (decoded, consumed) = Entry::from_bytes(&bytes).unwrap();
            prop_assert_eq!(consumed, bytes.len());
            prop_assert_eq!(decoded.raw_key(), raw_key.as_slice());
            prop_assert_eq!(decoded, entry);
        }
    }
}
