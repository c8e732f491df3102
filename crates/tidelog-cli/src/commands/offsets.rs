//! Offset list generation.

use std::path::Path;

use anyhow::{Context, Result};
use tidelog_config::TidelogConfig;
use tidelog_index::generate_compacted_list;
use tidelog_types::Offset;

use super::open_reader;

pub fn run(config: &TidelogConfig, path: &Path, base: u64) -> Result<()> {
    let mut reader = open_reader(config, path)?;
    let list = generate_compacted_list(Offset::new(base), &mut reader)
        .with_context(|| format!("Failed to read offsets from {}", path.display()))?;

    for offset in list.iter() {
        println!("{offset}");
    }
    tracing::info!(base, offsets = list.len(), "listed compacted offsets");

    reader.close();
    Ok(())
}
