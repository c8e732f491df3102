//! # tidelog-io: Backing file abstraction for tidelog
//!
//! The compaction index never talks to the filesystem directly. It writes and
//! reads through the [`IndexFile`] trait, which provides exactly what an index
//! needs: append, positional read, truncate, size and sync.
//!
//! - **[`DiskFile`]**: `std::fs` backed file
//! - **[`MemFile`]**: shared in-memory byte store, used by tests and tools
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │      tidelog-index       │
//! │  (uses IndexFile trait)  │
//! └────────────┬─────────────┘
//!              │
//! ┌────────────┴─────────────┐
//! │        tidelog-io        │
//! │  ┌─────────┐  ┌────────┐ │
//! │  │  Disk   │  │ Memory │ │
//! │  │  File   │  │  File  │ │
//! │  └─────────┘  └────────┘ │
//! └──────────────────────────┘
//! ```

mod disk;
mod error;
mod file;
mod mem;

pub use disk::DiskFile;
pub use error::IoError;
pub use file::IndexFile;
pub use mem::{MemFile, MemStore};
