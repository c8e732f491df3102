//! Footer inspection.

use std::path::Path;

use anyhow::{Context, Result};
use tidelog_config::TidelogConfig;

use super::open_reader;

pub fn run(config: &TidelogConfig, path: &Path, verify: bool) -> Result<()> {
    let mut reader = open_reader(config, path)?;
    let footer = reader
        .footer()
        .context("footer missing after load")?;

    println!("file:    {}", path.display());
    println!("version: {}", footer.version);
    println!("keys:    {}", footer.keys);
    println!("size:    {}", footer.size);
    println!("crc:     {:#010x}", footer.crc);

    if verify {
        reader
            .verify_integrity()
            .with_context(|| format!("Integrity check failed for {}", path.display()))?;
        println!("integrity: ok");
    }

    reader.close();
    Ok(())
}
