//! # tidelog-index: Per-segment compaction index
//!
//! A compaction index records, for every record in a log segment, the record
//! key and where the record lives. Compaction reads it back to decide which
//! records still hold the latest value of their key.
//!
//! # File Format
//!
//! ```text
//! ┌──────────┬──────────┬─────┬──────────┬──────────────┐
//! │ Entry 0  │ Entry 1  │ ... │ Entry N  │ Footer (21B) │
//! └──────────┴──────────┴─────┴──────────┴──────────────┘
//! ```
//!
//! Entries are framed as described in [`entry`]; the footer in [`footer`].
//! The file is append-only: entries are written in offset order and the
//! footer last.
//!
//! # Compaction Pass
//!
//! ```text
//! IndexWriter ──close──▶ index file ──▶ IndexReader
//!                                          │
//!                        ┌─────────────────┴──────────────────┐
//!                        ▼                                    ▼
//!              CompactionKeyReducer ──KeepSet──▶ FilteredCopyReducer
//!                                                             │
//!                                                  deduplicated index
//!                                                             │
//!                                                 generate_compacted_list
//! ```
//!
//! Both the writer and the key reducer work within a caller-provided byte
//! budget. Under pressure the writer spills to the file sooner and the key
//! reducer keeps some stale offsets; neither ever loses the latest offset of
//! a key.

pub mod entry;
mod error;
pub mod footer;
mod offsets;
mod reader;
pub mod reducers;
mod spill;
pub mod vint;
mod writer;

pub use entry::{Entry, MAX_KEY_SIZE};
pub use error::{FormatError, IndexError};
pub use footer::{FOOTER_SIZE, Footer, FormatVersion};
pub use offsets::{CompactedOffsetList, KeepSet};
pub use reader::{DEFAULT_READ_BUFFER, EntryIter, IndexReader};
pub use reducers::{
    CompactionKeyReducer, FilteredCopyReducer, Reducer, generate_compacted_list,
    natural_index_of_entries_to_keep, read_all_entries,
};
pub use spill::SpillKeyIndex;
pub use writer::{DEFAULT_SPILL_BUDGET, IndexWriter};
