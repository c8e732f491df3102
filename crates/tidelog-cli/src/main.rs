//! tidelog CLI.
//!
//! Offline tooling for per-segment compaction indexes.
//!
//! # Quick Start
//!
//! ```bash
//! # Show the footer and check the checksum
//! tidelog inspect 0-1.log.compaction_index --verify
//!
//! # Write a deduplicated copy
//! tidelog dedup 0-1.log.compaction_index 0-1.log.compaction_index.staging
//!
//! # List the offsets that survive, from offset 1000 on
//! tidelog offsets 0-1.log.compaction_index.staging --base 1000
//! ```

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tidelog_config::{ConfigLoader, TidelogConfig};

/// tidelog - compaction index tooling.
#[derive(Parser)]
#[command(name = "tidelog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Extra config file layered over tidelog.toml and tidelog.local.toml.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the footer of an index.
    Inspect {
        /// Path to the index file.
        path: PathBuf,

        /// Also recompute and check the checksum.
        #[arg(long)]
        verify: bool,
    },

    /// Print every entry of an index.
    Dump {
        /// Path to the index file.
        path: PathBuf,

        /// Stop after this many entries.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Write a copy of an index holding only the latest entry per key.
    Dedup {
        /// Index to read.
        input: PathBuf,

        /// Index to create. Overwritten if it exists.
        output: PathBuf,

        /// Key reducer memory budget in bytes (default: from config).
        #[arg(long)]
        key_budget: Option<usize>,

        /// Give up if the keep-set pass takes longer than this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// List the offsets present in an index at or after a base offset.
    Offsets {
        /// Path to the index file.
        path: PathBuf,

        /// Lowest offset to list.
        #[arg(long, default_value = "0")]
        base: u64,
    },

    /// Print the effective configuration as TOML.
    Config,
}

fn load_config(file: Option<&Path>) -> Result<TidelogConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(file) = file {
        loader = loader.with_file(file);
    }
    loader.load().context("Failed to load configuration")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Initialize logging; RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { path, verify } => commands::inspect::run(&config, &path, verify),
        Commands::Dump { path, limit } => commands::dump::run(&config, &path, limit),
        Commands::Dedup {
            input,
            output,
            key_budget,
            timeout_secs,
        } => commands::dedup::run(&config, &input, &output, key_budget, timeout_secs),
        Commands::Offsets { path, base } => commands::offsets::run(&config, &path, base),
        Commands::Config => commands::config::show(&config),
    }
}
