//! ci-watch - CI run monitor
//!
//! Polls a CI run through the provider's command-line tool until it
//! concludes, and pulls the error lines out of failed job logs.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

pub mod cli;
pub mod config;
pub mod extract;
pub mod monitor;
pub mod provider;

#[cfg(test)]
pub mod testutil;

// Re-export commonly used types
pub use cli::Console;
pub use config::WatchConfig;
pub use extract::{analyze_failed_jobs, fetch_excerpt, Excerpt, LogFilter};
pub use monitor::{MonitorSettings, RunMonitor, Verdict};
pub use provider::{GhCli, Job, Provider, ProviderError, RunState, RunView, ViewField};
