//! Configuration loader with multi-source merging

use crate::TidelogConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file, looked up in the project directory
pub const PROJECT_CONFIG_FILE: &str = "tidelog.toml";

/// Local overrides, looked up next to the project file
pub const LOCAL_CONFIG_FILE: &str = "tidelog.local.toml";

/// Configuration loader with builder pattern
#[derive(Debug)]
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "TIDELOG".to_string(),
            file: None,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "TIDELOG")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Layer an explicit config file over the project files. It must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<TidelogConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = TidelogConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. Project config (tidelog.toml), then local overrides
        for name in [PROJECT_CONFIG_FILE, LOCAL_CONFIG_FILE] {
            let path = self.project_dir.join(name);
            if path.exists() {
                builder = builder.add_source(
                    config::File::from(path)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 3. Explicit file
        if let Some(path) = &self.file {
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .required(true)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Environment variables (TIDELOG_INDEX__SPILL_BUDGET_BYTES=...)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let tidelog_config: TidelogConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        tidelog_config.validate()?;

        Ok(tidelog_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> TidelogConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
