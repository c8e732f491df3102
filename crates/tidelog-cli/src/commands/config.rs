//! Configuration display.

use anyhow::Result;
use tidelog_config::TidelogConfig;

/// Show the effective configuration.
pub fn show(config: &TidelogConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
