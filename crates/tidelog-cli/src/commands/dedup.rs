//! Index deduplication.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tidelog_config::TidelogConfig;
use tidelog_index::{CompactionKeyReducer, FilteredCopyReducer, IndexWriter};
use tidelog_io::DiskFile;

use super::open_reader;

/// Copies the latest entry of every key from `input` into a new index at
/// `output`.
///
/// The input checksum is verified first: a corrupted index must not drive
/// compaction.
pub fn run(
    config: &TidelogConfig,
    input: &Path,
    output: &Path,
    key_budget: Option<usize>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let mut reader = open_reader(config, input)?;
    reader
        .verify_integrity()
        .with_context(|| format!("Refusing to compact {}", input.display()))?;

    let budget = key_budget.unwrap_or_else(|| config.index.key_reducer_budget());
    let deadline = timeout_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
    let keep = reader
        .consume(CompactionKeyReducer::new(budget), deadline)
        .with_context(|| format!("Failed to compute keep set for {}", input.display()))?;

    let file = DiskFile::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = IndexWriter::new(file, config.index.spill_budget_bytes);

    reader.reset();
    let copied = reader
        .consume(FilteredCopyReducer::new(keep, &mut writer), None)
        .with_context(|| format!("Failed to copy entries into {}", output.display()))?;
    let written = writer
        .close()
        .with_context(|| format!("Failed to close {}", output.display()))?;

    let total = reader.footer().map_or(0, |footer| footer.keys);
    reader.close();

    println!("kept {copied} of {total} entries");
    println!("footer: {written}");
    Ok(())
}
