//! Configuration parser
//!
//! Parses `ci-watch.toml`. Every section and key is optional; anything left
//! out takes the built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "ci-watch.toml";

/// How to invoke the provider CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider executable (default: `gh`)
    #[serde(default = "default_program")]
    pub program: String,
    /// Repository in `owner/name` form, passed as `-R`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            repo: None,
        }
    }
}

fn default_program() -> String {
    "gh".to_string()
}

/// Polling loop limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Number of status checks before giving up (default: 5)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Seconds to wait between checks while the run is in progress (default: 120)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Seconds to wait after a failed provider query (default: 30)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            poll_interval_secs: default_poll_interval_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl MonitorConfig {
    /// Poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Retry delay as a `Duration`.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

const fn default_max_iterations() -> u32 {
    5
}

const fn default_poll_interval_secs() -> u64 {
    120
}

const fn default_retry_delay_secs() -> u64 {
    30
}

/// Log excerpt settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExtractConfig {
    /// Case-insensitive keywords that mark a log line as relevant
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Maximum matching lines to show (default: 20)
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
    /// Non-empty lines to show from the end when nothing matches (default: 30)
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            max_matches: default_max_matches(),
            tail_lines: default_tail_lines(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    ["error", "failed", "failure", "exception", "fatal"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

const fn default_max_matches() -> usize {
    20
}

const fn default_tail_lines() -> usize {
    30
}

/// Top-level configuration parsed from `ci-watch.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Provider invocation
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Polling loop
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Log excerpts
    #[serde(default)]
    pub extract: ExtractConfig,
}

impl WatchConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// An explicit path must exist. Without one, `ci-watch.toml` in the
    /// working directory is used if present, otherwise the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_path(&fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse a config file from a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse config content from a string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse ci-watch.toml")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.provider.program.trim().is_empty() {
            bail!("provider.program must not be empty");
        }
        if self.extract.keywords.is_empty() {
            bail!("extract.keywords must list at least one keyword");
        }
        if self.extract.keywords.iter().any(|k| k.trim().is_empty()) {
            bail!("extract.keywords must not contain blank entries");
        }
        if self.extract.max_matches == 0 {
            bail!("extract.max_matches must be at least 1");
        }
        if self.extract.tail_lines == 0 {
            bail!("extract.tail_lines must be at least 1");
        }
        Ok(())
    }
}
