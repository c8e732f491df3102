//! Configuration management for tidelog
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (TIDELOG_* prefix, highest precedence)
//! 2. An explicit file passed to [`ConfigLoader::with_file`]
//! 3. tidelog.local.toml (gitignored, local overrides)
//! 4. tidelog.toml (git-tracked, project config)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::{ConfigLoader, LOCAL_CONFIG_FILE, PROJECT_CONFIG_FILE};

/// Main tidelog configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TidelogConfig {
    pub index: IndexConfig,
    pub logging: LoggingConfig,
}

/// Memory and I/O sizing for compaction index writers, readers and reducers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Bytes of keys a writer buffers before spilling to the file.
    pub spill_budget_bytes: usize,
    /// Bytes of keys the keep-set reducer tracks. Unset means unbounded.
    pub key_reducer_budget_bytes: Option<usize>,
    /// Bytes a reader fetches from the file per read.
    pub read_buffer_bytes: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            spill_budget_bytes: 512 * 1024,
            key_reducer_budget_bytes: None,
            read_buffer_bytes: 32 * 1024,
        }
    }
}

impl IndexConfig {
    /// Keep-set reducer budget, with unset mapped to no bound at all.
    pub fn key_reducer_budget(&self) -> usize {
        self.key_reducer_budget_bytes.unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when RUST_LOG is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl TidelogConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parse a configuration from TOML text, filling gaps with defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values no index can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index.read_buffer_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "index.read_buffer_bytes must be greater than zero".to_string(),
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TidelogConfig::default();
        assert_eq!(config.index.spill_budget_bytes, 512 * 1024);
        assert_eq!(config.index.key_reducer_budget_bytes, None);
        assert_eq!(config.index.key_reducer_budget(), usize::MAX);
        assert_eq!(config.index.read_buffer_bytes, 32 * 1024);
        assert_eq!(config.logging.filter, "info");
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TidelogConfig::from_toml_str(
            r#"
[index]
key_reducer_budget_bytes = 4096
"#,
        )
        .unwrap();
        assert_eq!(config.index.key_reducer_budget(), 4096);
        assert_eq!(config.index.spill_budget_bytes, 512 * 1024);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_zero_read_buffer_is_rejected() {
        let err = TidelogConfig::from_toml_str("[index]\nread_buffer_bytes = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = TidelogConfig::from_toml_str("[index\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = TidelogConfig::default();
        config.index.key_reducer_budget_bytes = Some(1 << 20);
        config.logging.filter = "tidelog_index=debug".to_string();

        let text = config.to_toml_string().unwrap();
        assert_eq!(TidelogConfig::from_toml_str(&text).unwrap(), config);
    }
}
