//! CI provider integration
//!
//! The monitor and the log extractor talk to the CI system only through the
//! [`Provider`] trait. [`gh::GhCli`] implements it by shelling out to the
//! GitHub CLI; tests substitute a scripted fake.

use std::future::Future;

pub mod error;
pub mod gh;
pub mod types;

pub use error::ProviderError;
pub use gh::GhCli;
pub use types::{Job, JobOutcome, RunState, RunView, ViewField};

/// Read-only access to run state and job logs
pub trait Provider {
    /// Fetch a run snapshot restricted to `fields`.
    fn query_run(
        &self,
        run_id: &str,
        fields: &[ViewField],
    ) -> impl Future<Output = Result<RunView, ProviderError>>;

    /// Fetch the full raw log of one job.
    fn query_job_log(
        &self,
        run_id: &str,
        job_id: &str,
    ) -> impl Future<Output = Result<String, ProviderError>>;
}
