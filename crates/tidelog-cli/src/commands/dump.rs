//! Entry listing.

use std::path::Path;

use anyhow::{Context, Result};
use tidelog_config::TidelogConfig;

use super::open_reader;

/// Prints one tab-separated line per entry: offset, delta, batch kind, key.
///
/// Keys are printed without their batch kind prefix, with non-printable
/// bytes escaped.
pub fn run(config: &TidelogConfig, path: &Path, limit: Option<usize>) -> Result<()> {
    let mut reader = open_reader(config, path)?;

    for entry in reader.entries().take(limit.unwrap_or(usize::MAX)) {
        let entry = entry.with_context(|| format!("Failed to decode {}", path.display()))?;
        println!(
            "{}\t{}\t{}\t{}",
            entry.offset,
            entry.delta,
            entry.discriminator.as_byte(),
            entry.raw_key().escape_ascii()
        );
    }

    reader.close();
    Ok(())
}
