//! GitHub CLI provider
//!
//! Builds `std::process::Command`s for `gh run view` and runs them one at a
//! time, capturing stdout. JSON queries are parsed into [`RunView`]; log
//! queries return the raw text.

use std::process::{Command, Stdio};

use tokio::process::Command as TokioCommand;
use tracing::debug;

use super::error::ProviderError;
use super::types::{RunView, ViewField};
use super::Provider;
use crate::config::ProviderConfig;

/// Provider backed by the `gh` command-line tool
#[derive(Debug, Clone)]
pub struct GhCli {
    program: String,
    repo: Option<String>,
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new("gh")
    }
}

impl GhCli {
    /// Create a provider that invokes `program` with no repository override.
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            repo: None,
        }
    }

    /// Create a provider from the `[provider]` config section.
    #[must_use]
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            program: config.program.clone(),
            repo: config.repo.clone(),
        }
    }

    /// Target a specific `owner/name` repository (`-R`).
    #[must_use]
    pub fn with_repo(mut self, repo: &str) -> Self {
        self.repo = Some(repo.to_string());
        self
    }

    /// Program this provider invokes.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build `run view <run_id> --json <fields>`.
    #[must_use]
    pub fn build_view_command(&self, run_id: &str, fields: &[ViewField]) -> Command {
        let mut cmd = self.base_command(run_id);
        cmd.arg("--json").arg(ViewField::join(fields));
        cmd
    }

    /// Build `run view <run_id> --job <job_id> --log`.
    #[must_use]
    pub fn build_log_command(&self, run_id: &str, job_id: &str) -> Command {
        let mut cmd = self.base_command(run_id);
        cmd.arg("--job").arg(job_id).arg("--log");
        cmd
    }

    fn base_command(&self, run_id: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("run").arg("view").arg(run_id);
        if let Some(repo) = &self.repo {
            cmd.arg("-R").arg(repo);
        }
        cmd
    }

    /// Run a command to completion and return its stdout.
    ///
    /// Non-zero exit becomes [`ProviderError::Exit`] carrying the trimmed stderr.
    async fn capture(&self, cmd: Command) -> Result<String, ProviderError> {
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        debug!(program = %self.program, ?args, "invoking provider");

        let output = TokioCommand::from(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ProviderError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        debug!(code = ?output.status.code(), bytes = output.stdout.len(), "provider finished");

        if !output.status.success() {
            return Err(ProviderError::Exit {
                program: self.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Provider for GhCli {
    async fn query_run(&self, run_id: &str, fields: &[ViewField]) -> Result<RunView, ProviderError> {
        let stdout = self.capture(self.build_view_command(run_id, fields)).await?;
        Ok(serde_json::from_str(&stdout)?)
    }

    async fn query_job_log(&self, run_id: &str, job_id: &str) -> Result<String, ProviderError> {
        self.capture(self.build_log_command(run_id, job_id)).await
    }
}
