//! Mutex-guarded arena implementing both [`JobStore`] and [`EventLog`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use broker_core::error::AppError;
use broker_core::result::AppResult;
use broker_core::types::{JobId, LogfileHandle};
use broker_entity::job::{Job, JobEvent, JobFilter, JobStatus, NewJob};

use crate::store::{EventLog, JobStore};

#[derive(Debug, Default)]
struct Arena {
    /// Last identifier handed out. Never decremented.
    last_id: i64,
    jobs: BTreeMap<JobId, Job>,
}

impl Arena {
    fn job_mut(&mut self, id: JobId) -> AppResult<&mut Job> {
        self.jobs
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Job #{id} not found")))
    }
}

/// Appends the next event to `job`, returning a copy of it.
fn push_event(job: &mut Job, status: JobStatus) -> JobEvent {
    let sequence = job.latest_event().map_or(1, |event| event.sequence + 1);
    let event = JobEvent::now(sequence, status);
    job.events.push(event.clone());
    event
}

/// In-memory store. Every operation runs under one lock, which makes claims
/// trivially linearizable.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    arena: Arc<Mutex<Arena>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn create(&self, new_job: &NewJob) -> AppResult<Job> {
        new_job.validate()?;

        let mut arena = self.arena.lock().await;
        arena.last_id += 1;
        let id = JobId(arena.last_id);

        let job = Job {
            identifier: id,
            submitter: new_job.submitter.clone(),
            description: new_job.description.clone(),
            command: new_job.command.clone(),
            events: vec![JobEvent::now(1, JobStatus::Waiting)],
            logfile_handle: None,
        };
        arena.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: JobId) -> AppResult<Job> {
        let mut arena = self.arena.lock().await;
        arena.job_mut(id).map(|job| job.clone())
    }

    async fn delete(&self, id: JobId) -> AppResult<Job> {
        let mut arena = self.arena.lock().await;
        arena
            .jobs
            .remove(&id)
            .ok_or_else(|| AppError::not_found(format!("Job #{id} not found")))
    }

    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<Job>> {
        let arena = self.arena.lock().await;
        Ok(arena
            .jobs
            .values()
            .filter(|job| filter.matches(job.current_status(), &job.submitter))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &JobFilter) -> AppResult<u64> {
        let arena = self.arena.lock().await;
        Ok(arena
            .jobs
            .values()
            .filter(|job| filter.matches(job.current_status(), &job.submitter))
            .count() as u64)
    }

    async fn claim_next(&self) -> AppResult<Option<Job>> {
        let mut arena = self.arena.lock().await;
        let Some(job) = arena
            .jobs
            .values_mut()
            .find(|job| job.current_status() == JobStatus::Waiting)
        else {
            return Ok(None);
        };

        push_event(job, JobStatus::Running);
        info!(job_id = %job.identifier, "Job claimed");
        Ok(Some(job.clone()))
    }

    async fn attach_logfile(&self, id: JobId, handle: &LogfileHandle) -> AppResult<()> {
        let mut arena = self.arena.lock().await;
        let handle_taken = arena
            .jobs
            .values()
            .any(|job| job.logfile_handle.as_ref() == Some(handle));

        let job = arena.job_mut(id)?;
        if job.logfile_handle.is_some() {
            return Err(AppError::conflict(format!("Job #{id} already has a logfile")));
        }
        if handle_taken {
            return Err(AppError::conflict(format!(
                "Logfile handle {handle} is already in use"
            )));
        }
        job.logfile_handle = Some(handle.clone());
        Ok(())
    }

    async fn list_stale_running(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<JobId>> {
        let arena = self.arena.lock().await;
        Ok(arena
            .jobs
            .values()
            .filter(|job| {
                job.latest_event().is_some_and(|event| {
                    event.status == JobStatus::Running && event.recorded_at < cutoff
                })
            })
            .map(|job| job.identifier)
            .collect())
    }
}

#[async_trait]
impl EventLog for MemoryJobStore {
    async fn append(&self, id: JobId, status: JobStatus) -> AppResult<JobEvent> {
        let mut arena = self.arena.lock().await;
        let job = arena.job_mut(id)?;
        Ok(push_event(job, status))
    }

    async fn transition(&self, id: JobId, next: JobStatus) -> AppResult<JobEvent> {
        let mut arena = self.arena.lock().await;
        let job = arena.job_mut(id)?;
        let current = job.current_status();
        if let Err(err) = current.ensure_transition(next) {
            debug!(job_id = %id, from = %current, to = %next, "Rejected status change");
            return Err(err);
        }
        Ok(push_event(job, next))
    }

    async fn current_status(&self, id: JobId) -> AppResult<JobStatus> {
        let mut arena = self.arena.lock().await;
        arena.job_mut(id).map(|job| job.current_status())
    }

    async fn history(&self, id: JobId) -> AppResult<Vec<JobEvent>> {
        let mut arena = self.arena.lock().await;
        arena.job_mut(id).map(|job| job.events.clone())
    }
}
