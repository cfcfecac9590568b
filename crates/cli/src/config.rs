//! Configuration file and command-line overrides
//!
//! Every key is optional:
//!
//! ```toml
//! format = "json"
//! buffer_records = 20
//! log_level = "info"
//! log_file = "/var/log/pathwatch.log"
//! ```

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use watcher::{OutputFormat, WatchOptions, DEFAULT_BUFFER_RECORDS};

/// Accepted range for `buffer_records`
pub const BUFFER_RECORDS_RANGE: std::ops::RangeInclusive<usize> = 1..=1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Event line rendering
    pub format: OutputFormat,
    /// Read buffer capacity, in maximum-size records
    pub buffer_records: usize,
    /// Tracing filter directive
    pub log_level: String,
    /// Write logs here instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            buffer_records: DEFAULT_BUFFER_RECORDS,
            log_level: "warn".to_string(),
            log_file: None,
        }
    }
}

/// Flags that take precedence over the configuration file
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// Event output format (text or json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Read buffer capacity in maximum-size records (1-1024)
    #[arg(long, value_name = "N")]
    pub buffer_records: Option<usize>,

    /// Log filter, e.g. "debug" or "watcher=trace" (RUST_LOG wins if set)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl WatchConfig {
    /// Read a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: WatchConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if given, otherwise start from defaults, then apply flags
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate().context("Invalid configuration value")?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(format) = overrides.format {
            self.format = format;
        }
        if let Some(buffer_records) = overrides.buffer_records {
            self.buffer_records = buffer_records;
        }
        if let Some(log_level) = &overrides.log_level {
            self.log_level = log_level.clone();
        }
        if let Some(log_file) = &overrides.log_file {
            self.log_file = Some(log_file.clone());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !BUFFER_RECORDS_RANGE.contains(&self.buffer_records) {
            anyhow::bail!(
                "buffer_records must be between {} and {}, got {}",
                BUFFER_RECORDS_RANGE.start(),
                BUFFER_RECORDS_RANGE.end(),
                self.buffer_records
            );
        }

        EnvFilter::try_new(&self.log_level)
            .with_context(|| format!("log_level '{}' is not a valid filter", self.log_level))?;

        Ok(())
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            buffer_records: self.buffer_records,
            format: self.format,
            ..WatchOptions::default()
        }
    }
}
