//! ci-watch - CI run monitor
//!
//! CLI entry point.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ci_watch::config::WatchConfig;
use ci_watch::{analyze_failed_jobs, Console, GhCli, LogFilter, MonitorSettings, RunMonitor, Verdict};

/// Watch CI runs through the provider CLI
///
/// Polls a run until it concludes and pulls error lines out of the logs
/// of failed jobs.
#[derive(Parser, Debug)]
#[command(name = "ci-watch", version, about)]
struct Cli {
    /// Path to the configuration file (ci-watch.toml is used if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Trace provider invocations and polling decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll a run until it succeeds, fails, or the check budget runs out
    Monitor {
        /// Run identifier
        run_id: String,

        /// Number of checks before the final status query
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Seconds to wait between checks while the run is in progress
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },

    /// Show log excerpts for every failed job of a run
    Analyze {
        /// Run identifier
        run_id: String,
    },

    /// Print the current status of a run once
    Status {
        /// Run identifier
        run_id: String,
    },
}

/// Print a clap error and exit. Usage errors exit 1; help and version exit 0.
fn exit_on_parse_error(err: &clap::Error) -> ! {
    let _ = err.print();
    std::process::exit(i32::from(err.use_stderr()));
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "ci_watch=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Monitor settings from config, with command-line overrides applied.
fn monitor_settings(
    config: &WatchConfig,
    max_iterations: Option<u32>,
    interval: Option<u64>,
) -> MonitorSettings {
    let mut settings = MonitorSettings::from(&config.monitor);
    if let Some(n) = max_iterations {
        settings.max_iterations = n;
    }
    if let Some(secs) = interval {
        settings.poll_interval = Duration::from_secs(secs);
    }
    settings
}

async fn execute(command: &Commands, config: &WatchConfig) -> Result<Verdict> {
    let provider = GhCli::from_config(&config.provider);
    let mut console = Console::stdio();

    let verdict = match command {
        Commands::Monitor {
            run_id,
            max_iterations,
            interval,
        } => {
            let settings = monitor_settings(config, *max_iterations, *interval);
            RunMonitor::new(&provider, settings)
                .watch(run_id, &mut console)
                .await?
        }
        Commands::Analyze { run_id } => {
            let filter = LogFilter::from(&config.extract);
            analyze_failed_jobs(&provider, &filter, run_id, &mut console).await?
        }
        Commands::Status { run_id } => {
            RunMonitor::new(&provider, MonitorSettings::from(&config.monitor))
                .status(run_id, &mut console)
                .await?
        }
    };

    console.flush()?;
    Ok(verdict)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|e| exit_on_parse_error(&e));
    init_tracing(cli.verbose);

    let config = WatchConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let verdict = execute(&cli.command, &config).await?;
    std::process::exit(verdict.exit_code());
}
