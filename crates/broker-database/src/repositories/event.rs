//! Job event repository implementation.
//!
//! Every append locks the owning `jobs` row, so appends to one job are
//! serialized and `last_sequence` always names the newest event.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use broker_core::error::{AppError, ErrorKind};
use broker_core::result::AppResult;
use broker_core::types::JobId;
use broker_entity::job::{JobEvent, JobStatus};

use crate::store::EventLog;

/// Repository for the append-only `job_events` table.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn append_inner(
        &self,
        id: JobId,
        status: JobStatus,
        checked: bool,
    ) -> AppResult<JobEvent> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let last_sequence = lock_job(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Job #{id} not found")))?;

        if checked {
            let current = status_at(&mut tx, id, last_sequence).await?;
            if let Err(err) = current.ensure_transition(status) {
                debug!(job_id = %id, from = %current, to = %status, "Rejected status change");
                return Err(err);
            }
        }

        let event = insert_event(&mut tx, id, last_sequence + 1, status).await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit status event", e)
        })?;

        info!(job_id = %id, status = %status, sequence = event.sequence, "Job status recorded");
        Ok(event)
    }
}

#[async_trait]
impl EventLog for EventRepository {
    async fn append(&self, id: JobId, status: JobStatus) -> AppResult<JobEvent> {
        self.append_inner(id, status, false).await
    }

    async fn transition(&self, id: JobId, next: JobStatus) -> AppResult<JobEvent> {
        self.append_inner(id, next, true).await
    }

    async fn current_status(&self, id: JobId) -> AppResult<JobStatus> {
        sqlx::query_scalar::<_, JobStatus>(
            "SELECT e.status FROM jobs j \
             JOIN job_events e ON e.job_id = j.id AND e.sequence = j.last_sequence \
             WHERE j.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read job status", e))?
        .ok_or_else(|| AppError::not_found(format!("Job #{id} not found")))
    }

    async fn history(&self, id: JobId) -> AppResult<Vec<JobEvent>> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to acquire connection", e)
        })?;
        let events = fetch_events(&mut conn, id).await?;
        if events.is_empty() {
            return Err(AppError::not_found(format!("Job #{id} not found")));
        }
        Ok(events)
    }
}

/// Lock the job row and return its `last_sequence`, or `None` if absent.
pub(crate) async fn lock_job(conn: &mut PgConnection, id: JobId) -> AppResult<Option<i64>> {
    sqlx::query_scalar::<_, i64>("SELECT last_sequence FROM jobs WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock job", e))
}

/// Status recorded by the event at `sequence`.
pub(crate) async fn status_at(
    conn: &mut PgConnection,
    id: JobId,
    sequence: i64,
) -> AppResult<JobStatus> {
    sqlx::query_scalar::<_, JobStatus>(
        "SELECT status FROM job_events WHERE job_id = $1 AND sequence = $2",
    )
    .bind(id)
    .bind(sequence)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read job status", e))?
    .ok_or_else(|| AppError::internal(format!("Job #{id} has no event at sequence {sequence}")))
}

/// Insert the event at `sequence` and advance the job's counter.
///
/// The caller must hold the row lock from [`lock_job`].
pub(crate) async fn insert_event(
    conn: &mut PgConnection,
    id: JobId,
    sequence: i64,
    status: JobStatus,
) -> AppResult<JobEvent> {
    sqlx::query("UPDATE jobs SET last_sequence = $2 WHERE id = $1")
        .bind(id)
        .bind(sequence)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to advance job sequence", e)
        })?;

    sqlx::query_as::<_, JobEvent>(
        "INSERT INTO job_events (job_id, sequence, status) VALUES ($1, $2, $3) \
         RETURNING sequence, status, recorded_at",
    )
    .bind(id)
    .bind(sequence)
    .bind(status)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert job event", e))
}

/// All events for one job, oldest first. Empty if the job does not exist.
pub(crate) async fn fetch_events(conn: &mut PgConnection, id: JobId) -> AppResult<Vec<JobEvent>> {
    sqlx::query_as::<_, JobEvent>(
        "SELECT sequence, status, recorded_at FROM job_events \
         WHERE job_id = $1 ORDER BY sequence ASC",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load job events", e))
}
