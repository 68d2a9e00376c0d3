//! Request DTOs.

use serde::{Deserialize, Serialize};

use broker_entity::job::NewJob;

/// Body of `POST /jobs`.
///
/// Missing fields default to empty strings so that they are reported as a
/// validation error rather than a body parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    /// Submitting user. `user` is accepted as an alias.
    #[serde(default, alias = "user")]
    pub submitter: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Command for the runner to execute.
    #[serde(default)]
    pub command: String,
}

impl From<SubmitJobRequest> for NewJob {
    fn from(req: SubmitJobRequest) -> Self {
        NewJob::new(req.submitter, req.description, req.command)
    }
}

/// Body of `PUT /runners/update-job`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateJobRequest {
    /// Job to update.
    pub identifier: Option<i64>,
    /// Status name (`"DONE"`) or ordinal (`5`), kept raw for the scheduler to parse.
    #[serde(default)]
    pub status: serde_json::Value,
}

/// Query string of `GET /jobs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    /// Only WAITING and RUNNING jobs.
    #[serde(default)]
    pub active: bool,
    /// Only jobs from this submitter.
    pub submitter: Option<String>,
}
