//! Job entity model.

use broker_core::error::AppError;
use broker_core::types::{JobId, LogfileHandle};
use serde::{Deserialize, Serialize};

use super::event::JobEvent;
use super::status::JobStatus;

/// A submitted unit of work together with its full status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Store-assigned identifier.
    pub identifier: JobId,
    /// Who submitted the job.
    pub submitter: String,
    /// Human-readable description.
    pub description: String,
    /// Command the runner executes.
    pub command: String,
    /// Status history, ordered by sequence ascending. Never empty.
    pub events: Vec<JobEvent>,
    /// Stored logfile, once a runner has uploaded one.
    pub logfile_handle: Option<LogfileHandle>,
}

impl Job {
    /// Newest event in the history.
    pub fn latest_event(&self) -> Option<&JobEvent> {
        self.events.last()
    }

    /// Status carried by the newest event.
    ///
    /// A job always has at least one event, so the `Unknown` fallback is
    /// only observable on a hand-built value.
    pub fn current_status(&self) -> JobStatus {
        self.latest_event()
            .map(|event| event.status)
            .unwrap_or(JobStatus::Unknown)
    }

    /// Whether the job is WAITING or RUNNING.
    pub fn is_active(&self) -> bool {
        self.current_status().is_active()
    }
}

/// Data required to submit a new job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewJob {
    /// Who submits the job.
    pub submitter: String,
    /// Human-readable description.
    pub description: String,
    /// Command the runner executes.
    pub command: String,
}

impl NewJob {
    /// Build a submission.
    pub fn new(
        submitter: impl Into<String>,
        description: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            submitter: submitter.into(),
            description: description.into(),
            command: command.into(),
        }
    }

    /// Reject blank fields. Whitespace-only counts as blank.
    pub fn validate(&self) -> Result<(), AppError> {
        let fields = [
            ("submitter", &self.submitter),
            ("description", &self.description),
            ("command", &self.command),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

/// Selection criteria for listing and counting jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// Keep only jobs whose current status is one of these.
    pub statuses: Option<Vec<JobStatus>>,
    /// Keep only jobs from this submitter.
    pub submitter: Option<String>,
}

impl JobFilter {
    /// Match every job.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match WAITING and RUNNING jobs.
    pub fn active() -> Self {
        Self::with_status([JobStatus::Waiting, JobStatus::Running])
    }

    /// Match jobs whose current status is in `statuses`.
    pub fn with_status(statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        Self {
            statuses: Some(statuses.into_iter().collect()),
            submitter: None,
        }
    }

    /// Narrow the filter to one submitter.
    pub fn submitted_by(mut self, submitter: impl Into<String>) -> Self {
        self.submitter = Some(submitter.into());
        self
    }

    /// Status ordinals for SQL `= ANY($1)` binding, if a status filter is set.
    pub fn status_ordinals(&self) -> Option<Vec<i16>> {
        self.statuses
            .as_ref()
            .map(|statuses| statuses.iter().map(|s| s.ordinal()).collect())
    }

    /// Evaluate the filter against a job's derived status and submitter.
    pub fn matches(&self, status: JobStatus, submitter: &str) -> bool {
        let status_ok = self
            .statuses
            .as_ref()
            .is_none_or(|statuses| statuses.contains(&status));
        let submitter_ok = self
            .submitter
            .as_deref()
            .is_none_or(|wanted| wanted == submitter);
        status_ok && submitter_ok
    }
}
