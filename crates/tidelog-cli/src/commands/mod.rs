//! CLI command implementations.

pub mod config;
pub mod dedup;
pub mod dump;
pub mod inspect;
pub mod offsets;

use std::path::Path;

use anyhow::{Context, Result};
use tidelog_config::TidelogConfig;
use tidelog_index::IndexReader;
use tidelog_io::DiskFile;

/// Opens `path` read-only and loads its footer.
fn open_reader(config: &TidelogConfig, path: &Path) -> Result<IndexReader> {
    let file = DiskFile::open(path)
        .with_context(|| format!("Failed to open index {}", path.display()))?;
    let mut reader = IndexReader::with_buffer_size(file, config.index.read_buffer_bytes);
    reader
        .load_footer()
        .with_context(|| format!("Failed to read footer of {}", path.display()))?;
    Ok(reader)
}
