//! Terminal rendering for run reports
//!
//! Report lines go to stdout, provider errors to stderr. Both streams are
//! owned by a [`Console`] so tests can capture them.

use std::io::{self, Stderr, Stdout, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::provider::{Job, JobOutcome, RunView};

/// Width of the `=` and `-` rules printed between sections
pub const RULE_WIDTH: usize = 60;

/// Output sink pair for reports and errors
pub struct Console<O: Write, E: Write> {
    out: O,
    err: E,
}

impl Console<Stdout, Stderr> {
    /// Console writing to the process's stdout and stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl Console<Vec<u8>, Vec<u8>> {
    /// Console that collects everything in memory.
    #[must_use]
    pub const fn buffered() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Everything written to the report stream so far.
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    /// Everything written to the error stream so far.
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.err).into_owned()
    }
}

impl<O: Write, E: Write> Console<O, E> {
    /// Wrap an arbitrary pair of writers.
    pub const fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Write one report line.
    pub fn line(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.out, "{}", text.as_ref()).context("Failed to write report")
    }

    /// Write an empty report line.
    pub fn blank(&mut self) -> Result<()> {
        self.line("")
    }

    /// Write one line to the error stream.
    pub fn error(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.err, "{}", text.as_ref()).context("Failed to write error output")
    }

    /// Flush both streams.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush report")?;
        self.err.flush().context("Failed to flush error output")
    }
}

/// Icon for a job outcome
#[must_use]
pub const fn outcome_icon(outcome: JobOutcome) -> &'static str {
    match outcome {
        JobOutcome::Success => "✅",
        JobOutcome::Failure => "❌",
        JobOutcome::Pending => "⏳",
    }
}

/// `  <icon> <name>: <status>`
#[must_use]
pub fn job_line(job: &Job) -> String {
    format!(
        "  {} {}: {}",
        outcome_icon(job.outcome()),
        job.name.bold(),
        job.display_status()
    )
}

/// Status block for one snapshot: effective status, then every job.
#[must_use]
pub fn status_block(view: &RunView) -> Vec<String> {
    let mut lines = Vec::with_capacity(view.jobs.len() + 3);
    lines.push(format!("Статус: {}", colored_status(view.final_status())));
    lines.push(String::new());
    lines.push(format!("Jobs ({}):", view.jobs.len()));
    lines.extend(view.jobs.iter().map(job_line));
    lines
}

/// Color a status word by what it means for the run.
#[must_use]
pub fn colored_status(status: &str) -> String {
    match status {
        "success" => status.green().bold().to_string(),
        "failure" | "cancelled" => status.red().bold().to_string(),
        _ => status.yellow().to_string(),
    }
}

/// Human-readable wait time: whole minutes as `N мин`, otherwise seconds.
#[must_use]
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} мин", secs / 60)
    } else {
        format!("{secs} с")
    }
}

/// Horizontal rule made of `ch`.
#[must_use]
pub fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}
