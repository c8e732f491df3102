//! # tidelog-types: Core types for `tidelog`
//!
//! Shared value types used across the tidelog crates:
//! - Log positions ([`Offset`])
//! - Record batch discriminators ([`BatchKind`])

use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Sub},
};

// ============================================================================
// Offset - logical position of a record within a segment
// ============================================================================

/// Logical position of a record within a log segment.
///
/// Offsets are assigned in append order and never decrease within a segment.
/// They are plain 8-byte values and cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Offset(u64);

impl Offset {
    pub const ZERO: Offset = Offset(0);

    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Returns the offset as a `u64`.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the offset reinterpreted as an `i64`.
    ///
    /// The on-disk varint encoding is signed; the bit pattern round-trips
    /// through [`Offset::from_i64_bits`].
    pub fn as_i64_bits(&self) -> i64 {
        self.0 as i64
    }

    /// Rebuilds an offset from the bit pattern produced by [`Offset::as_i64_bits`].
    pub fn from_i64_bits(bits: i64) -> Self {
        Self(bits as u64)
    }
}

impl Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Offset {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Offset {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Offset {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Offset> for u64 {
    fn from(offset: Offset) -> Self {
        offset.0
    }
}

// ============================================================================
// BatchKind - one-byte discriminator carried with every indexed key
// ============================================================================

/// Category of the record batch a key came from.
///
/// The compaction index never interprets this value. It travels with every
/// key so that keys from different batch categories never collide during
/// deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BatchKind(u8);

impl BatchKind {
    pub const fn new(kind: u8) -> Self {
        Self(kind)
    }

    /// Returns the single byte written to disk.
    pub fn as_byte(&self) -> u8 {
        self.0
    }
}

impl Display for BatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch-kind({})", self.0)
    }
}

impl From<u8> for BatchKind {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<BatchKind> for u8 {
    fn from(kind: BatchKind) -> Self {
        kind.0
    }
}
