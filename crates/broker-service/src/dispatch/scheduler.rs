//! The scheduler mediates between submitters, runners, and storage.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use broker_core::error::{AppError, ErrorKind};
use broker_core::result::AppResult;
use broker_core::traits::storage::LogStore;
use broker_core::types::{JobId, LogfileHandle};
use broker_database::StoreManager;
use broker_database::store::{EventLog, JobStore};
use broker_entity::job::{Job, JobEvent, JobFilter, JobStatus, NewJob};

/// Snapshot of how many jobs are in each dispatch-relevant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    /// Every stored job.
    pub total: u64,
    /// Jobs eligible for dispatch.
    pub waiting: u64,
    /// Jobs claimed by a runner.
    pub running: u64,
}

/// Dispatch engine handle shared by request handlers and background tasks.
#[derive(Debug, Clone)]
pub struct Scheduler {
    jobs: Arc<dyn JobStore>,
    events: Arc<dyn EventLog>,
    logs: Arc<dyn LogStore>,
}

impl Scheduler {
    /// Creates a scheduler over explicit store implementations.
    pub fn new(jobs: Arc<dyn JobStore>, events: Arc<dyn EventLog>, logs: Arc<dyn LogStore>) -> Self {
        Self { jobs, events, logs }
    }

    /// Creates a scheduler over the configured backends.
    pub fn from_managers(stores: &StoreManager, logs: Arc<dyn LogStore>) -> Self {
        Self::new(stores.jobs(), stores.events(), logs)
    }

    /// Submits a job. It starts WAITING with a single event.
    pub async fn submit(&self, new_job: NewJob) -> AppResult<Job> {
        if let Err(err) = new_job.validate() {
            debug!(error = %err, "Rejected job submission");
            return Err(err);
        }

        let job = self.jobs.create(&new_job).await.inspect_err(|e| {
            error!(error = %e, "Failed to store submitted job");
        })?;

        info!(
            job_id = %job.identifier,
            submitter = %job.submitter,
            "Job submitted"
        );
        Ok(job)
    }

    /// Removes a job regardless of status, together with its history and logfile.
    pub async fn remove(&self, id: JobId) -> AppResult<()> {
        let job = self.jobs.delete(id).await.inspect_err(|e| {
            if e.is_not_found() {
                warn!(job_id = %id, "Remove requested for unknown job");
            }
        })?;

        if let Some(handle) = &job.logfile_handle {
            // The job is already gone; an orphaned blob is only wasted space.
            if let Err(e) = self.logs.delete(handle).await {
                warn!(job_id = %id, handle = %handle, error = %e, "Failed to delete logfile");
            }
        }

        info!(job_id = %id, status = %job.current_status(), "Job removed");
        Ok(())
    }

    /// Lists jobs in identifier order.
    ///
    /// `active_only` keeps WAITING and RUNNING jobs; otherwise terminal jobs
    /// are included for audit views.
    pub async fn list_jobs(&self, active_only: bool, submitter: Option<&str>) -> AppResult<Vec<Job>> {
        let mut filter = if active_only {
            JobFilter::active()
        } else {
            JobFilter::all()
        };
        if let Some(submitter) = submitter {
            filter = filter.submitted_by(submitter);
        }
        self.jobs.list(&filter).await
    }

    /// Loads one job.
    pub async fn get_job(&self, id: JobId) -> AppResult<Job> {
        self.jobs.get(id).await
    }

    /// Status history, oldest first.
    pub async fn history(&self, id: JobId) -> AppResult<Vec<JobEvent>> {
        self.events.history(id).await
    }

    /// Status of the newest event.
    pub async fn current_status(&self, id: JobId) -> AppResult<JobStatus> {
        self.events.current_status(id).await
    }

    /// Number of jobs matching `filter`.
    pub async fn count(&self, filter: &JobFilter) -> AppResult<u64> {
        self.jobs.count(filter).await
    }

    /// Totals reported by the detailed health endpoint.
    pub async fn counts(&self) -> AppResult<JobCounts> {
        Ok(JobCounts {
            total: self.jobs.count(&JobFilter::all()).await?,
            waiting: self
                .jobs
                .count(&JobFilter::with_status([JobStatus::Waiting]))
                .await?,
            running: self
                .jobs
                .count(&JobFilter::with_status([JobStatus::Running]))
                .await?,
        })
    }

    /// Claims the oldest WAITING job, moving it to RUNNING in the same step.
    ///
    /// Returns `None` when nothing is waiting.
    pub async fn claim_next(&self) -> AppResult<Option<Job>> {
        let claimed = self.jobs.claim_next().await?;
        if claimed.is_none() {
            debug!("No waiting job to claim");
        }
        Ok(claimed)
    }

    /// Applies a runner's status report given as a raw token (name or ordinal).
    ///
    /// The token is checked before the job is looked up, so an unrecognized
    /// status is reported even for an unknown job.
    pub async fn update_status(&self, id: JobId, token: &serde_json::Value) -> AppResult<JobEvent> {
        let status = JobStatus::from_token(token).inspect_err(|_| {
            debug!(job_id = %id, token = %token, "Rejected unrecognized status");
        })?;
        self.set_status(id, status).await
    }

    /// Moves a job to `status` if the state machine allows it.
    pub async fn set_status(&self, id: JobId, status: JobStatus) -> AppResult<JobEvent> {
        match self.events.transition(id, status).await {
            Ok(event) => {
                info!(job_id = %id, status = %status, sequence = event.sequence, "Job status updated");
                Ok(event)
            }
            Err(e) => {
                match e.kind {
                    ErrorKind::NotFound => warn!(job_id = %id, "Status update for unknown job"),
                    ErrorKind::IllegalTransition => {
                        warn!(job_id = %id, to = %status, reason = %e.message, "Illegal status update")
                    }
                    _ => error!(job_id = %id, error = %e, "Failed to record status update"),
                }
                Err(e)
            }
        }
    }

    /// Allocates a logfile handle and records it on the job without storing
    /// any content.
    pub async fn attach_logfile(&self, id: JobId) -> AppResult<LogfileHandle> {
        self.ensure_no_logfile(id).await?;
        let handle = self.logs.allocate_handle().await?;
        self.jobs.attach_logfile(id, &handle).await?;
        info!(job_id = %id, handle = %handle, "Logfile attached");
        Ok(handle)
    }

    /// Stores `data` as the job's logfile.
    ///
    /// The blob is written before the handle is recorded; if recording loses a
    /// race with another upload, the blob is deleted again.
    pub async fn upload_logfile(&self, id: JobId, data: Bytes) -> AppResult<LogfileHandle> {
        self.ensure_no_logfile(id).await?;

        let handle = self.logs.allocate_handle().await?;
        let size = self.logs.write(&handle, data).await?;

        if let Err(e) = self.jobs.attach_logfile(id, &handle).await {
            if let Err(cleanup) = self.logs.delete(&handle).await {
                warn!(handle = %handle, error = %cleanup, "Failed to discard unattached logfile");
            }
            return Err(e);
        }

        info!(job_id = %id, handle = %handle, bytes = size, "Logfile uploaded");
        Ok(handle)
    }

    /// The job's logfile handle, or `None` if no logfile was attached yet.
    pub async fn get_logfile(&self, id: JobId) -> AppResult<Option<LogfileHandle>> {
        let job = self.jobs.get(id).await.inspect_err(|e| {
            if e.is_not_found() {
                debug!(job_id = %id, "Logfile requested for unknown job");
            }
        })?;
        if job.logfile_handle.is_none() {
            debug!(job_id = %id, "Job has no logfile yet");
        }
        Ok(job.logfile_handle)
    }

    /// The job's logfile content, or `None` if nothing was uploaded.
    pub async fn read_logfile(&self, id: JobId) -> AppResult<Option<Bytes>> {
        let Some(handle) = self.get_logfile(id).await? else {
            return Ok(None);
        };
        match self.logs.read(&handle).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_not_found() => {
                debug!(job_id = %id, handle = %handle, "Logfile handle has no content");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Moves RUNNING jobs with no status report for `timeout` to UNKNOWN.
    ///
    /// Returns the jobs that were expired. A job that changed state between
    /// the scan and the transition is skipped.
    pub async fn expire_stale_leases(&self, timeout: Duration) -> AppResult<Vec<JobId>> {
        let timeout = TimeDelta::from_std(timeout)
            .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Lease timeout out of range", e))?;
        let cutoff = Utc::now() - timeout;

        let mut expired = Vec::new();
        for id in self.jobs.list_stale_running(cutoff).await? {
            match self.events.transition(id, JobStatus::Unknown).await {
                Ok(_) => {
                    warn!(job_id = %id, "Lease expired, job marked UNKNOWN");
                    expired.push(id);
                }
                Err(e) if matches!(e.kind, ErrorKind::NotFound | ErrorKind::IllegalTransition) => {
                    debug!(job_id = %id, reason = %e.message, "Stale job changed before expiry");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(expired)
    }

    async fn ensure_no_logfile(&self, id: JobId) -> AppResult<()> {
        match self.jobs.get(id).await?.logfile_handle {
            Some(_) => Err(AppError::conflict(format!("Job #{id} already has a logfile"))),
            None => Ok(()),
        }
    }
}
