//! Shared test utilities
//!
//! Common helpers used across test modules. Only compiled in test builds.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use crate::provider::{Job, Provider, ProviderError, RunView, ViewField};

/// Disable ANSI colors so rendered lines can be compared as plain text.
pub fn plain_output() {
    colored::control::set_override(false);
}

/// Build a job with the given fields.
#[must_use]
pub fn job(id: u64, name: &str, status: &str, conclusion: &str) -> Job {
    Job {
        id: id.to_string(),
        name: name.to_string(),
        status: status.to_string(),
        conclusion: conclusion.to_string(),
    }
}

/// Build a run snapshot.
#[must_use]
pub fn run(status: &str, conclusion: &str, jobs: Vec<Job>) -> RunView {
    RunView {
        status: status.to_string(),
        conclusion: conclusion.to_string(),
        jobs,
    }
}

/// A provider invocation failure like a non-zero `gh` exit.
#[must_use]
pub fn exit_error() -> ProviderError {
    ProviderError::Exit {
        program: "gh".to_string(),
        code: Some(1),
        stderr: "HTTP 502: Bad Gateway".to_string(),
    }
}

/// A malformed-response failure.
#[must_use]
pub fn parse_error() -> ProviderError {
    serde_json::from_str::<RunView>("<html>").unwrap_err().into()
}

/// Provider that replays scripted responses and records every call.
///
/// Run queries are answered from a queue; once it is empty every further
/// query fails. Job logs are looked up by job id; unknown ids fail.
#[derive(Default)]
pub struct FakeProvider {
    runs: RefCell<VecDeque<Result<RunView, ProviderError>>>,
    logs: HashMap<String, String>,
    run_queries: Cell<usize>,
    fields_seen: RefCell<Vec<Vec<ViewField>>>,
    log_queries: RefCell<Vec<String>>,
}

impl FakeProvider {
    /// Empty fake: every query fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful run response.
    #[must_use]
    pub fn with_run(self, view: RunView) -> Self {
        self.runs.borrow_mut().push_back(Ok(view));
        self
    }

    /// Queue a failing run response.
    #[must_use]
    pub fn with_run_error(self, error: ProviderError) -> Self {
        self.runs.borrow_mut().push_back(Err(error));
        self
    }

    /// Register the log text returned for `job_id`.
    #[must_use]
    pub fn with_log(mut self, job_id: &str, text: &str) -> Self {
        self.logs.insert(job_id.to_string(), text.to_string());
        self
    }

    /// Number of run queries answered so far.
    #[must_use]
    pub fn run_queries(&self) -> usize {
        self.run_queries.get()
    }

    /// Field selections of every run query, in call order.
    #[must_use]
    pub fn fields_seen(&self) -> Vec<Vec<ViewField>> {
        self.fields_seen.borrow().clone()
    }

    /// Job ids of every log query, in call order.
    #[must_use]
    pub fn log_queries(&self) -> Vec<String> {
        self.log_queries.borrow().clone()
    }
}

impl Provider for FakeProvider {
    async fn query_run(&self, _run_id: &str, fields: &[ViewField]) -> Result<RunView, ProviderError> {
        self.run_queries.set(self.run_queries.get() + 1);
        self.fields_seen.borrow_mut().push(fields.to_vec());
        self.runs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(exit_error()))
    }

    async fn query_job_log(&self, _run_id: &str, job_id: &str) -> Result<String, ProviderError> {
        self.log_queries.borrow_mut().push(job_id.to_string());
        self.logs.get(job_id).cloned().ok_or_else(|| ProviderError::Exit {
            program: "gh".to_string(),
            code: Some(1),
            stderr: format!("job {job_id} not found"),
        })
    }
}
