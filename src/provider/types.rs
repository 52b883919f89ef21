//! Run and job snapshots as reported by the provider
//!
//! These mirror the JSON returned by `gh run view --json ...`. Every field is
//! optional on the wire so the same types serve all field selections.

use serde::{Deserialize, Deserializer, Serialize};

/// Fields that can be requested from `run view --json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewField {
    /// Run status (`queued`, `in_progress`, `completed`, ...)
    Status,
    /// Terminal outcome of the run
    Conclusion,
    /// Per-job breakdown
    Jobs,
}

impl ViewField {
    /// Field selection used by the monitor loop.
    pub const MONITOR: [Self; 3] = [Self::Status, Self::Conclusion, Self::Jobs];
    /// Field selection used by one-shot status checks.
    pub const STATUS: [Self; 2] = [Self::Status, Self::Conclusion];
    /// Field selection used by failed-job analysis.
    pub const JOBS: [Self; 1] = [Self::Jobs];

    /// Name of the field as understood by the provider.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Conclusion => "conclusion",
            Self::Jobs => "jobs",
        }
    }

    /// Join a field selection into the comma-separated `--json` argument.
    #[must_use]
    pub fn join(fields: &[Self]) -> String {
        fields
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Overall state of a run, derived from its effective status string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Concluded with `success`
    Succeeded,
    /// Concluded with `failure` or `cancelled`
    Failed,
    /// Anything else: queued, in progress, or an outcome we don't stop on
    Running,
}

impl RunState {
    /// Classify an effective status string.
    #[must_use]
    pub fn classify(status: &str) -> Self {
        match status {
            "success" => Self::Succeeded,
            "failure" | "cancelled" => Self::Failed,
            _ => Self::Running,
        }
    }
}

/// Outcome bucket used to pick a job's icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Job concluded with `success`
    Success,
    /// Job concluded with `failure`
    Failure,
    /// Still running, or any other conclusion
    Pending,
}

/// One job of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Provider job id; `gh` reports it as `databaseId`
    #[serde(alias = "databaseId", default, deserialize_with = "id_from_any")]
    pub id: String,
    /// Job name as shown in the workflow
    #[serde(default = "unknown")]
    pub name: String,
    /// Job status
    #[serde(default, deserialize_with = "string_or_null")]
    pub status: String,
    /// Job conclusion; empty while the job is running
    #[serde(default, deserialize_with = "string_or_null")]
    pub conclusion: String,
}

impl Job {
    /// Status to display: the conclusion when set, otherwise the status.
    #[must_use]
    pub fn display_status(&self) -> &str {
        if !self.conclusion.is_empty() {
            &self.conclusion
        } else if !self.status.is_empty() {
            &self.status
        } else {
            "unknown"
        }
    }

    /// Icon bucket for this job.
    #[must_use]
    pub fn outcome(&self) -> JobOutcome {
        match self.display_status() {
            "success" => JobOutcome::Success,
            "failure" => JobOutcome::Failure,
            _ => JobOutcome::Pending,
        }
    }

    /// True when the job concluded with `failure`.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.conclusion == "failure"
    }

    /// True once the job has any conclusion.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.conclusion.is_empty()
    }
}

/// Snapshot of a run returned by `run view --json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunView {
    /// Run status
    #[serde(default, deserialize_with = "string_or_null")]
    pub status: String,
    /// Run conclusion; empty while the run is in progress
    #[serde(default, deserialize_with = "string_or_null")]
    pub conclusion: String,
    /// Jobs in provider order
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl RunView {
    /// The conclusion if set, otherwise the status.
    #[must_use]
    pub fn final_status(&self) -> &str {
        if !self.conclusion.is_empty() {
            &self.conclusion
        } else if !self.status.is_empty() {
            &self.status
        } else {
            "unknown"
        }
    }

    /// State derived from [`Self::final_status`].
    #[must_use]
    pub fn state(&self) -> RunState {
        RunState::classify(self.final_status())
    }

    /// Jobs whose conclusion is `failure`, in provider order.
    pub fn failed_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|j| j.is_failed())
    }
}

fn unknown() -> String {
    "unknown".to_string()
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(n)) => n.to_string(),
        Some(RawId::Text(s)) => s,
        None => String::new(),
    })
}
