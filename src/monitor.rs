//! Run monitor
//!
//! Polls a run until it concludes or the iteration budget runs out, printing
//! a per-job report on every check.
//!
//! A failed provider query is not fatal: the error goes to stderr, the loop
//! waits the retry delay and moves on to the next check. When the budget is
//! exhausted one last query decides the verdict.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use tracing::debug;

use crate::cli::display::{colored_status, format_interval, status_block, Console};
use crate::config::MonitorConfig;
use crate::provider::{Provider, RunState, RunView, ViewField};

/// Final outcome of a command, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Exit code 0
    Success,
    /// Exit code 1
    Failure,
}

impl Verdict {
    /// Process exit code for this verdict.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }

    /// `Success` only for a run that concluded with `success`.
    #[must_use]
    pub fn of_run(view: &RunView) -> Self {
        if view.state() == RunState::Succeeded {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// Polling limits for [`RunMonitor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Number of checks before the final query
    pub max_iterations: u32,
    /// Wait between checks while the run is in progress
    pub poll_interval: Duration,
    /// Wait after a failed provider query
    pub retry_delay: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            poll_interval: config.poll_interval(),
            retry_delay: config.retry_delay(),
        }
    }
}

/// Watches a single run through a [`Provider`]
pub struct RunMonitor<'a, P> {
    provider: &'a P,
    settings: MonitorSettings,
}

impl<'a, P: Provider> RunMonitor<'a, P> {
    /// Create a monitor over `provider`.
    #[must_use]
    pub const fn new(provider: &'a P, settings: MonitorSettings) -> Self {
        Self { provider, settings }
    }

    /// Poll `run_id` until it concludes or the budget is spent.
    pub async fn watch<O: Write, E: Write>(
        &self,
        run_id: &str,
        console: &mut Console<O, E>,
    ) -> Result<Verdict> {
        let MonitorSettings {
            max_iterations,
            poll_interval,
            retry_delay,
        } = self.settings;

        console.line(format!("Мониторинг пайплайна: {}", run_id.bold()))?;
        console.line(format!(
            "Проверка каждые {}, максимум {max_iterations} проверок",
            format_interval(poll_interval)
        ))?;
        console.blank()?;

        for iteration in 1..=max_iterations {
            console.line(
                format!(
                    "=== Проверка {iteration}/{max_iterations} ({}) ===",
                    chrono::Local::now().format("%H:%M:%S")
                )
                .cyan()
                .to_string(),
            )?;

            let view = match self.provider.query_run(run_id, &ViewField::MONITOR).await {
                Ok(view) => view,
                Err(e) => {
                    debug!(run_id, iteration, error = %e, "status query failed");
                    console.error(e.console_message())?;
                    console.line(format!(
                        "Не удалось получить статус, повторяем через {}...",
                        format_interval(retry_delay)
                    ))?;
                    console.flush()?;
                    tokio::time::sleep(retry_delay).await;
                    continue;
                }
            };

            for line in status_block(&view) {
                console.line(line)?;
            }

            let state = view.state();
            debug!(run_id, iteration, ?state, "status checked");

            match state {
                RunState::Succeeded => {
                    console.blank()?;
                    console.line("✅ Пайплайн успешно завершен!".green().bold().to_string())?;
                    return Ok(Verdict::Success);
                }
                RunState::Failed => {
                    console.blank()?;
                    console.line(
                        format!("❌ Пайплайн завершился с ошибкой: {}", view.final_status())
                            .red()
                            .bold()
                            .to_string(),
                    )?;
                    let mut failed = view.failed_jobs().peekable();
                    if failed.peek().is_some() {
                        console.blank()?;
                        console.line("Упавшие jobs:")?;
                        for job in failed {
                            console.line(format!("  - {}", job.name))?;
                        }
                    }
                    return Ok(Verdict::Failure);
                }
                RunState::Running => {
                    console.blank()?;
                    console.line(format!(
                        "⏳ Пайплайн еще выполняется, ждем {}...",
                        format_interval(poll_interval)
                    ))?;
                    console.flush()?;
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }

        console.blank()?;
        console.line(
            "⚠️ Достигнуто максимальное количество проверок"
                .yellow()
                .to_string(),
        )?;
        self.final_check(run_id, console).await
    }

    /// Query once, print the status block, and judge the run by it.
    async fn final_check<O: Write, E: Write>(
        &self,
        run_id: &str,
        console: &mut Console<O, E>,
    ) -> Result<Verdict> {
        match self.provider.query_run(run_id, &ViewField::MONITOR).await {
            Ok(view) => {
                for line in status_block(&view) {
                    console.line(line)?;
                }
                debug!(run_id, state = ?view.state(), "final status checked");
                Ok(Verdict::of_run(&view))
            }
            Err(e) => {
                debug!(run_id, error = %e, "final status query failed");
                console.error(e.console_message())?;
                Ok(Verdict::Failure)
            }
        }
    }

    /// Single status check without jobs; no waiting, no retries.
    pub async fn status<O: Write, E: Write>(
        &self,
        run_id: &str,
        console: &mut Console<O, E>,
    ) -> Result<Verdict> {
        match self.provider.query_run(run_id, &ViewField::STATUS).await {
            Ok(view) => {
                console.line(format!("Статус: {}", colored_status(view.final_status())))?;
                Ok(Verdict::of_run(&view))
            }
            Err(e) => {
                console.error(e.console_message())?;
                Ok(Verdict::Failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{exit_error, job, parse_error, plain_output, run, FakeProvider};
    use tokio::time::Instant;

    fn assert_waited(start: Instant, secs: u64) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_secs(secs) && elapsed < Duration::from_secs(secs + 1),
            "expected ~{secs}s of waiting, got {elapsed:?}"
        );
    }

    fn settings(max_iterations: u32) -> MonitorSettings {
        MonitorSettings {
            max_iterations,
            ..MonitorSettings::default()
        }
    }

    #[test]
    fn test_default_settings() {
        let s = MonitorSettings::default();
        assert_eq!(s.max_iterations, 5);
        assert_eq!(s.poll_interval, Duration::from_secs(120));
        assert_eq!(s.retry_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_verdict_exit_codes() {
        assert_eq!(Verdict::Success.exit_code(), 0);
        assert_eq!(Verdict::Failure.exit_code(), 1);
    }

    #[test]
    fn test_verdict_of_run() {
        assert_eq!(Verdict::of_run(&run("completed", "success", vec![])), Verdict::Success);
        assert_eq!(Verdict::of_run(&run("completed", "failure", vec![])), Verdict::Failure);
        assert_eq!(Verdict::of_run(&run("in_progress", "", vec![])), Verdict::Failure);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_returns_immediately_without_sleeping() {
        plain_output();
        let provider = FakeProvider::new()
            .with_run(run("completed", "success", vec![job(1, "build", "completed", "success")]));
        let mut console = Console::buffered();
        let start = Instant::now();

        let verdict = RunMonitor::new(&provider, settings(5))
            .watch("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Success);
        assert_eq!(provider.run_queries(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        let out = console.stdout_text();
        assert!(out.contains("Мониторинг пайплайна: 123"));
        assert!(out.contains("=== Проверка 1/5"));
        assert!(out.contains("  ✅ build: success"));
        assert!(out.contains("✅ Пайплайн успешно завершен!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_lists_failed_jobs() {
        plain_output();
        let provider = FakeProvider::new().with_run(run(
            "completed",
            "failure",
            vec![
                job(1, "build", "completed", "success"),
                job(2, "unit tests", "completed", "failure"),
                job(3, "e2e", "completed", "failure"),
            ],
        ));
        let mut console = Console::buffered();

        let verdict = RunMonitor::new(&provider, settings(5))
            .watch("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Failure);
        assert_eq!(provider.run_queries(), 1);
        let out = console.stdout_text();
        assert!(out.contains("❌ Пайплайн завершился с ошибкой: failure"));
        assert!(out.contains("Упавшие jobs:\n  - unit tests\n  - e2e\n"));
        assert!(!out.contains("  - build"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_is_terminal_failure() {
        plain_output();
        let provider = FakeProvider::new().with_run(run(
            "completed",
            "cancelled",
            vec![job(1, "build", "completed", "cancelled")],
        ));
        let mut console = Console::buffered();

        let verdict = RunMonitor::new(&provider, settings(5))
            .watch("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Failure);
        assert_eq!(provider.run_queries(), 1);
        let out = console.stdout_text();
        assert!(out.contains("завершился с ошибкой: cancelled"));
        assert!(!out.contains("Упавшие jobs:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_poll_interval_while_running() {
        plain_output();
        let provider = FakeProvider::new()
            .with_run(run("queued", "", vec![]))
            .with_run(run("in_progress", "", vec![job(1, "build", "in_progress", "")]))
            .with_run(run("completed", "success", vec![job(1, "build", "completed", "success")]));
        let mut console = Console::buffered();
        let start = Instant::now();

        let verdict = RunMonitor::new(&provider, settings(5))
            .watch("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Success);
        assert_eq!(provider.run_queries(), 3);
        assert_waited(start, 240);
        let out = console.stdout_text();
        assert!(out.contains("  ⏳ build: in_progress"));
        assert!(out.contains("⏳ Пайплайн еще выполняется, ждем 2 мин..."));
        assert!(out.contains("=== Проверка 3/5"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cap_reached_does_one_final_query() {
        plain_output();
        let provider = FakeProvider::new()
            .with_run(run("in_progress", "", vec![]))
            .with_run(run("in_progress", "", vec![]))
            .with_run(run("completed", "success", vec![]));
        let mut console = Console::buffered();

        let verdict = RunMonitor::new(&provider, settings(2))
            .watch("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Success);
        assert_eq!(provider.run_queries(), 3);
        let out = console.stdout_text();
        assert!(out.contains("Достигнуто максимальное количество проверок"));
        assert!(!out.contains("Пайплайн успешно завершен"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cap_reached_still_running_is_failure() {
        plain_output();
        let provider = FakeProvider::new()
            .with_run(run("in_progress", "", vec![]))
            .with_run(run("in_progress", "", vec![]));

        let mut console = Console::buffered();
        let verdict = RunMonitor::new(&provider, settings(1))
            .watch("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Failure);
        assert_eq!(provider.run_queries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_query_failure_counts_as_failure() {
        plain_output();
        let provider = FakeProvider::new().with_run(run("in_progress", "", vec![]));
        let mut console = Console::buffered();

        let verdict = RunMonitor::new(&provider, settings(1))
            .watch("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Failure);
        assert_eq!(provider.run_queries(), 2);
        assert!(console.stderr_text().contains("Ошибка"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_error_every_call() {
        plain_output();
        let provider = FakeProvider::new()
            .with_run_error(exit_error())
            .with_run_error(parse_error())
            .with_run_error(exit_error());
        let mut console = Console::buffered();
        let start = Instant::now();

        let verdict = RunMonitor::new(&provider, settings(3))
            .watch("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Failure);
        // three checks plus the final query, which finds the queue empty
        assert_eq!(provider.run_queries(), 4);
        assert_waited(start, 90);

        let err = console.stderr_text();
        assert_eq!(err.matches("Ошибка").count(), 4);
        assert!(err.contains("Ошибка выполнения команды"));
        assert!(err.contains("Ошибка парсинга JSON"));
        let out = console.stdout_text();
        assert_eq!(
            out.matches("Не удалось получить статус, повторяем через 30 с...")
                .count(),
            3
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_error() {
        plain_output();
        let provider = FakeProvider::new()
            .with_run_error(exit_error())
            .with_run(run("completed", "success", vec![]));
        let mut console = Console::buffered();
        let start = Instant::now();

        let verdict = RunMonitor::new(&provider, settings(5))
            .watch("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Success);
        assert_waited(start, 30);
        assert!(console.stdout_text().contains("=== Проверка 2/5"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_iterations_only_final_query() {
        plain_output();
        let provider = FakeProvider::new().with_run(run("completed", "success", vec![]));
        let mut console = Console::buffered();

        let verdict = RunMonitor::new(&provider, settings(0))
            .watch("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Success);
        assert_eq!(provider.run_queries(), 1);
        assert!(!console.stdout_text().contains("=== Проверка"));
    }

    #[tokio::test]
    async fn test_monitor_requests_jobs() {
        let provider = FakeProvider::new().with_run(run("completed", "success", vec![]));
        let mut console = Console::buffered();
        RunMonitor::new(&provider, settings(1))
            .watch("123", &mut console)
            .await
            .unwrap();
        assert_eq!(provider.fields_seen(), vec![ViewField::MONITOR.to_vec()]);
    }

    #[tokio::test]
    async fn test_status_one_shot() {
        plain_output();
        let provider = FakeProvider::new().with_run(run("completed", "success", vec![]));
        let mut console = Console::buffered();

        let verdict = RunMonitor::new(&provider, MonitorSettings::default())
            .status("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Success);
        assert_eq!(console.stdout_text(), "Статус: success\n");
        assert_eq!(provider.fields_seen(), vec![ViewField::STATUS.to_vec()]);
    }

    #[tokio::test]
    async fn test_status_in_progress_is_failure() {
        plain_output();
        let provider = FakeProvider::new().with_run(run("in_progress", "", vec![]));
        let mut console = Console::buffered();

        let verdict = RunMonitor::new(&provider, MonitorSettings::default())
            .status("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Failure);
        assert_eq!(console.stdout_text(), "Статус: in_progress\n");
    }

    #[tokio::test]
    async fn test_status_query_error() {
        let provider = FakeProvider::new();
        let mut console = Console::buffered();

        let verdict = RunMonitor::new(&provider, MonitorSettings::default())
            .status("123", &mut console)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Failure);
        assert!(console.stderr_text().starts_with("Ошибка выполнения команды"));
    }
}
