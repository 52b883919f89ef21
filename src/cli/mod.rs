//! CLI output formatting
//!
//! Human-readable, colored rendering of run snapshots and job excerpts.

pub mod display;

pub use display::Console;
pub use display::{format_interval, job_line, outcome_icon, status_block};
