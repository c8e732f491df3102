//! Zig-zag LEB128 variable-length integers.
//!
//! Values are zig-zag mapped so small magnitudes of either sign stay short,
//! then written 7 bits per byte, least significant group first, with the high
//! bit set on every byte except the last.

use crate::FormatError;

/// Longest encoding of any `i64`.
pub const MAX_LENGTH: usize = 10;

#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
}

/// Returns the number of bytes [`encode`] writes for `value`.
pub fn encoded_len(value: i64) -> usize {
    let mut v = zigzag_encode(value);
    let mut len = 1;
    while v >= 0x80 {
        v >>= 7;
        len += 1;
    }
    len
}

/// Appends the encoding of `value` to `buf`.
pub fn encode(value: i64, buf: &mut Vec<u8>) {
    let mut v = zigzag_encode(value);
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Decodes a value from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode(buf: &[u8]) -> Result<(i64, usize), FormatError> {
    let mut result: u64 = 0;
    for (i, &byte) in buf.iter().enumerate().take(MAX_LENGTH) {
        let payload = u64::from(byte & 0x7F);
        let shift = 7 * i as u32;
        // The tenth byte may only contribute the single remaining bit.
        if i == MAX_LENGTH - 1 && payload > 1 {
            return Err(FormatError::VarintOverflow);
        }
        result |= payload << shift;
        if byte & 0x80 == 0 {
            return Ok((zigzag_decode(result), i + 1));
        }
    }
    if buf.len() >= MAX_LENGTH {
        Err(FormatError::VarintOverflow)
    } else {
        Err(FormatError::UnexpectedEof {
            needed: buf.len() + 1,
            available: buf.len(),
        })
    }
}
