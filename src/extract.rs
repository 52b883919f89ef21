//! Failure log extraction
//!
//! Surfaces the interesting part of a failed job's log: lines containing an
//! error keyword, or the end of the log when nothing matches.

use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use tracing::debug;

use crate::cli::display::{rule, Console};
use crate::config::ExtractConfig;
use crate::monitor::Verdict;
use crate::provider::{Provider, ViewField};

/// Lines selected from a job log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Excerpt {
    /// Keyword hits, capped; `total` counts every hit in the log
    Matches {
        /// Number of matching lines in the whole log
        total: usize,
        /// The first matching lines, in log order
        lines: Vec<String>,
    },
    /// Last non-empty lines of a log with no keyword hits
    Tail(Vec<String>),
}

impl Excerpt {
    /// The selected lines, in log order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        match self {
            Self::Matches { lines, .. } | Self::Tail(lines) => lines,
        }
    }
}

/// Keyword filter with a match cap and a tail fallback
#[derive(Debug, Clone)]
pub struct LogFilter {
    keywords: Vec<String>,
    max_matches: usize,
    tail_lines: usize,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self::from(&ExtractConfig::default())
    }
}

impl From<&ExtractConfig> for LogFilter {
    fn from(config: &ExtractConfig) -> Self {
        Self {
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
            max_matches: config.max_matches,
            tail_lines: config.tail_lines,
        }
    }
}

impl LogFilter {
    /// Configured match cap.
    #[must_use]
    pub const fn max_matches(&self) -> usize {
        self.max_matches
    }

    /// Configured tail size.
    #[must_use]
    pub const fn tail_lines(&self) -> usize {
        self.tail_lines
    }

    /// Whether `line` contains any keyword, ignoring case.
    #[must_use]
    pub fn is_match(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Select lines from a raw log.
    #[must_use]
    pub fn extract(&self, log: &str) -> Excerpt {
        let mut total = 0;
        let mut lines = Vec::new();
        for line in log.lines().filter(|l| self.is_match(l)) {
            total += 1;
            if lines.len() < self.max_matches {
                lines.push(line.to_string());
            }
        }

        if total > 0 {
            return Excerpt::Matches { total, lines };
        }

        let non_empty: Vec<&str> = log.lines().filter(|l| !l.trim().is_empty()).collect();
        let skip = non_empty.len().saturating_sub(self.tail_lines);
        Excerpt::Tail(non_empty[skip..].iter().map(ToString::to_string).collect())
    }
}

/// Fetch one job's log and extract the relevant lines.
///
/// A failed fetch yields a single synthetic line describing the failure.
pub async fn fetch_excerpt<P: Provider>(
    provider: &P,
    filter: &LogFilter,
    run_id: &str,
    job_id: &str,
) -> Excerpt {
    let log = match provider.query_job_log(run_id, job_id).await {
        Ok(text) => text,
        Err(e) => {
            debug!(run_id, job_id, error = %e, "log fetch failed");
            format!("Ошибка при получении логов: {e}")
        }
    };
    filter.extract(&log)
}

/// Print the excerpt under its heading, indented three spaces.
pub fn print_excerpt<O: Write, E: Write>(
    excerpt: &Excerpt,
    filter: &LogFilter,
    console: &mut Console<O, E>,
) -> Result<()> {
    match excerpt {
        Excerpt::Matches { total, .. } => console.line(format!(
            "   Найдено {total} строк с ошибками (первые {}):",
            filter.max_matches()
        ))?,
        Excerpt::Tail(_) => console.line(format!(
            "   Последние {} строк логов:",
            filter.tail_lines()
        ))?,
    }
    for line in excerpt.lines() {
        console.line(format!("   {line}"))?;
    }
    Ok(())
}

/// Report every failed job of a run with an excerpt of its log.
///
/// `Success` means the run has no failed jobs; finding any, or failing to
/// list the jobs at all, is a `Failure`.
pub async fn analyze_failed_jobs<P: Provider, O: Write, E: Write>(
    provider: &P,
    filter: &LogFilter,
    run_id: &str,
    console: &mut Console<O, E>,
) -> Result<Verdict> {
    console.line(format!("Анализ упавших jobs для run: {}", run_id.bold()))?;
    console.line(rule('='))?;
    console.blank()?;

    let jobs = match provider.query_run(run_id, &ViewField::JOBS).await {
        Ok(view) => view.jobs,
        Err(e) => {
            console.error(format!("Ошибка при получении информации о jobs: {e}"))?;
            Vec::new()
        }
    };

    if jobs.is_empty() {
        console.line("Не удалось получить информацию о jobs")?;
        return Ok(Verdict::Failure);
    }

    let failed: Vec<_> = jobs.iter().filter(|j| j.is_failed()).collect();
    if failed.is_empty() {
        console.line("✅ Нет упавших jobs".green().to_string())?;
        return Ok(Verdict::Success);
    }

    console.line(format!("Найдено упавших jobs: {}", failed.len()))?;
    console.blank()?;

    for job in failed {
        console.line(format!("❌ Job: {}", job.name.bold()))?;
        console.line(format!("   ID: {}", job.id))?;
        console.line(format!("   Status: {}", job.status))?;
        console.line(format!("   Conclusion: {}", job.conclusion))?;
        console.blank()?;

        console.line("   Получение логов...")?;
        console.flush()?;
        let excerpt = fetch_excerpt(provider, filter, run_id, &job.id).await;
        debug!(job_id = %job.id, lines = excerpt.lines().len(), "excerpt ready");
        print_excerpt(&excerpt, filter, console)?;

        console.blank()?;
        console.line(rule('-'))?;
        console.blank()?;
    }

    Ok(Verdict::Failure)
}
