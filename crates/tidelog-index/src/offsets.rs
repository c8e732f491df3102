//! Offset sets produced by the reducers.

use std::fmt::{self, Display};

use roaring::RoaringTreemap;
use tidelog_types::Offset;

/// How many offsets `Display` prints before eliding the rest.
const DISPLAY_LIMIT: usize = 16;

fn write_offsets(f: &mut fmt::Formatter<'_>, bitmap: &RoaringTreemap) -> fmt::Result {
    write!(f, "{{")?;
    for (i, offset) in bitmap.iter().take(DISPLAY_LIMIT).enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{offset}")?;
    }
    if bitmap.len() > DISPLAY_LIMIT as u64 {
        write!(f, ",...")?;
    }
    write!(f, "}}")
}

/// Offsets whose records must survive compaction.
///
/// Produced by [`crate::CompactionKeyReducer`] and consumed by
/// [`crate::FilteredCopyReducer`].
#[derive(Debug, Clone, PartialEq)]
pub struct KeepSet {
    offsets: RoaringTreemap,
}

impl KeepSet {
    pub fn new() -> Self {
        Self {
            offsets: RoaringTreemap::new(),
        }
    }

    /// Adds an offset. Returns false if it was already present.
    pub fn insert(&mut self, offset: Offset) -> bool {
        self.offsets.insert(offset.as_u64())
    }

    pub fn contains(&self, offset: Offset) -> bool {
        self.offsets.contains(offset.as_u64())
    }

    /// Number of offsets in the set.
    pub fn cardinality(&self) -> u64 {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Iterates offsets in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = Offset> + '_ {
        self.offsets.iter().map(Offset::new)
    }
}

impl Default for KeepSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Offset> for KeepSet {
    fn from_iter<I: IntoIterator<Item = Offset>>(iter: I) -> Self {
        Self {
            offsets: iter.into_iter().map(|o| o.as_u64()).collect(),
        }
    }
}

impl Display for KeepSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_offsets(f, &self.offsets)
    }
}

/// Offsets present in a deduplicated index at or after a base offset.
///
/// This is what segment rewriting asks, record by record: is this offset
/// still wanted?
#[derive(Debug, Clone, PartialEq)]
pub struct CompactedOffsetList {
    base: Offset,
    offsets: RoaringTreemap,
}

impl CompactedOffsetList {
    pub fn new(base: Offset) -> Self {
        Self {
            base,
            offsets: RoaringTreemap::new(),
        }
    }

    /// Lowest offset the list tracks.
    pub fn base(&self) -> Offset {
        self.base
    }

    /// Records `offset` if it is at or after the base. Returns whether it was added.
    pub fn add(&mut self, offset: Offset) -> bool {
        offset >= self.base && self.offsets.insert(offset.as_u64())
    }

    pub fn contains(&self, offset: Offset) -> bool {
        self.offsets.contains(offset.as_u64())
    }

    pub fn len(&self) -> u64 {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Iterates offsets in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = Offset> + '_ {
        self.offsets.iter().map(Offset::new)
    }
}

impl Display for CompactedOffsetList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "base {} ", self.base)?;
        write_offsets(f, &self.offsets)
    }
}
