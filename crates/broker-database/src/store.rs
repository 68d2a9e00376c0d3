//! Persistence traits for jobs and their status history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use broker_core::result::AppResult;
use broker_core::types::{JobId, LogfileHandle};
use broker_entity::job::{Job, JobEvent, JobFilter, JobStatus, NewJob};

/// Durable repository of jobs.
///
/// Every method that takes a [`JobId`] fails with `NotFound` when the job
/// does not exist.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Backend name (e.g., "postgres", "memory").
    fn backend(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Validate and insert a job together with its initial WAITING event.
    ///
    /// Identifiers are allocated atomically and never reused.
    async fn create(&self, new_job: &NewJob) -> AppResult<Job>;

    /// Load a job with its full history.
    async fn get(&self, id: JobId) -> AppResult<Job>;

    /// Delete a job and its events, returning what was removed.
    async fn delete(&self, id: JobId) -> AppResult<Job>;

    /// Jobs matching `filter`, ordered by identifier ascending.
    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<Job>>;

    /// Number of jobs matching `filter`.
    async fn count(&self, filter: &JobFilter) -> AppResult<u64>;

    /// Atomically pick the WAITING job with the smallest identifier and move
    /// it to RUNNING. Concurrent callers never receive the same job.
    async fn claim_next(&self) -> AppResult<Option<Job>>;

    /// Record `handle` on the job. Fails with `Conflict` if one is already set.
    async fn attach_logfile(&self, id: JobId, handle: &LogfileHandle) -> AppResult<()>;

    /// RUNNING jobs whose newest event was recorded before `cutoff`.
    async fn list_stale_running(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<JobId>>;
}

/// Append-only per-job status history.
#[async_trait]
pub trait EventLog: Send + Sync + std::fmt::Debug + 'static {
    /// Append `status` without consulting the state machine.
    async fn append(&self, id: JobId, status: JobStatus) -> AppResult<JobEvent>;

    /// Append `next` only if the current status may move to it; fails with
    /// `IllegalTransition` otherwise. The check and the append are atomic.
    async fn transition(&self, id: JobId, next: JobStatus) -> AppResult<JobEvent>;

    /// Status of the newest event.
    async fn current_status(&self, id: JobId) -> AppResult<JobStatus>;

    /// Every event for the job, ordered by sequence ascending.
    async fn history(&self, id: JobId) -> AppResult<Vec<JobEvent>>;
}
