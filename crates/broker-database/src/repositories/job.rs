//! Job repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, info};

use broker_core::error::{AppError, ErrorKind};
use broker_core::result::AppResult;
use broker_core::types::{JobId, LogfileHandle};
use broker_entity::job::{Job, JobEvent, JobFilter, JobStatus, NewJob};

use super::event::{fetch_events, insert_event, lock_job, status_at};
use crate::store::JobStore;

/// Columns of `jobs` that make up a [`Job`].
const JOB_COLUMNS: &str = "j.id, j.submitter, j.description, j.command, j.logfile_handle";

/// Join each job to its newest event so filters see the derived status.
const CURRENT_EVENT_JOIN: &str =
    "FROM jobs j JOIN job_events e ON e.job_id = j.id AND e.sequence = j.last_sequence";

/// Filter clause shared by list and count. Binds `$1` (SMALLINT[]) and `$2` (TEXT).
const FILTER_CLAUSE: &str =
    "WHERE ($1::SMALLINT[] IS NULL OR e.status = ANY($1)) AND ($2::TEXT IS NULL OR j.submitter = $2)";

#[derive(Debug, FromRow)]
struct JobRow {
    id: JobId,
    submitter: String,
    description: String,
    command: String,
    logfile_handle: Option<LogfileHandle>,
}

impl JobRow {
    fn into_job(self, events: Vec<JobEvent>) -> Job {
        Job {
            identifier: self.id,
            submitter: self.submitter,
            description: self.description,
            command: self.command,
            events,
            logfile_handle: self.logfile_handle,
        }
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    job_id: i64,
    sequence: i64,
    status: JobStatus,
    recorded_at: DateTime<Utc>,
}

/// Repository for job rows, including the claim query runners poll.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(conn: &mut PgConnection, id: JobId, for_update: bool) -> AppResult<Option<Job>> {
        let sql = format!(
            "SELECT id, submitter, description, command, logfile_handle FROM jobs WHERE id = $1{}",
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))?;

        match row {
            Some(row) => {
                let events = fetch_events(conn, id).await?;
                Ok(Some(row.into_job(events)))
            }
            None => Ok(None),
        }
    }

    /// Open a read-only transaction whose statements all see one snapshot.
    async fn begin_read(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to set read snapshot", e)
            })?;
        Ok(tx)
    }

    /// Attach histories to a batch of job rows with one query.
    ///
    /// Must run on the connection that selected `rows` so both reads share a snapshot.
    async fn hydrate(conn: &mut PgConnection, rows: Vec<JobRow>) -> AppResult<Vec<Job>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|row| row.id.get()).collect();

        let event_rows = sqlx::query_as::<_, EventRow>(
            "SELECT job_id, sequence, status, recorded_at FROM job_events \
             WHERE job_id = ANY($1) ORDER BY job_id ASC, sequence ASC",
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load job events", e))?;

        let mut by_job: HashMap<i64, Vec<JobEvent>> = HashMap::with_capacity(rows.len());
        for row in event_rows {
            by_job.entry(row.job_id).or_default().push(JobEvent {
                sequence: row.sequence,
                status: row.status,
                recorded_at: row.recorded_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let events = by_job.remove(&row.id.get()).unwrap_or_default();
                row.into_job(events)
            })
            .collect())
    }

    async fn finish_read(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to end read transaction", e)
        })
    }
}

#[async_trait]
impl JobStore for JobRepository {
    fn backend(&self) -> &str {
        "postgres"
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }

    async fn create(&self, new_job: &NewJob) -> AppResult<Job> {
        new_job.validate()?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let row = sqlx::query_as::<_, JobRow>(
            "INSERT INTO jobs (submitter, description, command) VALUES ($1, $2, $3) \
             RETURNING id, submitter, description, command, logfile_handle",
        )
        .bind(&new_job.submitter)
        .bind(&new_job.description)
        .bind(&new_job.command)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create job", e))?;

        let event = insert_event(&mut tx, row.id, 1, JobStatus::Waiting).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit job", e))?;

        Ok(row.into_job(vec![event]))
    }

    async fn get(&self, id: JobId) -> AppResult<Job> {
        let mut tx = self.begin_read().await?;
        let job = Self::load(&mut tx, id, false).await?;
        Self::finish_read(tx).await?;
        job.ok_or_else(|| AppError::not_found(format!("Job #{id} not found")))
    }

    async fn delete(&self, id: JobId) -> AppResult<Job> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let job = Self::load(&mut tx, id, true)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Job #{id} not found")))?;

        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete job", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit job deletion", e)
        })?;

        Ok(job)
    }

    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} {CURRENT_EVENT_JOIN} {FILTER_CLAUSE} ORDER BY j.id ASC");
        let mut tx = self.begin_read().await?;
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(filter.status_ordinals())
            .bind(filter.submitter.as_deref())
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))?;

        let jobs = Self::hydrate(&mut tx, rows).await?;
        Self::finish_read(tx).await?;
        Ok(jobs)
    }

    async fn count(&self, filter: &JobFilter) -> AppResult<u64> {
        let sql = format!("SELECT COUNT(*) {CURRENT_EVENT_JOIN} {FILTER_CLAUSE}");
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(filter.status_ordinals())
            .bind(filter.submitter.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))?;

        Ok(count.max(0) as u64)
    }

    async fn claim_next(&self) -> AppResult<Option<Job>> {
        let candidate_sql = format!(
            "SELECT j.id {CURRENT_EVENT_JOIN} WHERE e.status = $1 \
             ORDER BY j.id ASC LIMIT 1 FOR UPDATE OF j SKIP LOCKED"
        );

        loop {
            let mut tx = self.pool.begin().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
            })?;

            let candidate = sqlx::query_scalar::<_, JobId>(&candidate_sql)
                .bind(JobStatus::Waiting)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to select waiting job", e)
                })?;

            let Some(id) = candidate else {
                return Ok(None);
            };

            // The row is locked now, but the snapshot that chose it may be stale.
            let last_sequence = lock_job(&mut tx, id)
                .await?
                .ok_or_else(|| AppError::internal(format!("Job #{id} vanished while locked")))?;
            let current = status_at(&mut tx, id, last_sequence).await?;
            if current != JobStatus::Waiting {
                debug!(job_id = %id, status = %current, "Claim candidate changed, retrying");
                tx.rollback().await.map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to roll back claim", e)
                })?;
                continue;
            }

            insert_event(&mut tx, id, last_sequence + 1, JobStatus::Running).await?;
            let job = Self::load(&mut tx, id, false)
                .await?
                .ok_or_else(|| AppError::internal(format!("Job #{id} vanished while locked")))?;

            tx.commit()
                .await
                .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit claim", e))?;

            info!(job_id = %id, "Job claimed");
            return Ok(Some(job));
        }
    }

    async fn attach_logfile(&self, id: JobId, handle: &LogfileHandle) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE jobs SET logfile_handle = $2 WHERE id = $1 AND logfile_handle IS NULL",
        )
        .bind(id)
        .bind(handle)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to attach logfile", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))?;

        if exists {
            Err(AppError::conflict(format!(
                "Job #{id} already has a logfile"
            )))
        } else {
            Err(AppError::not_found(format!("Job #{id} not found")))
        }
    }

    async fn list_stale_running(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<JobId>> {
        let sql = format!(
            "SELECT j.id {CURRENT_EVENT_JOIN} WHERE e.status = $1 AND e.recorded_at < $2 \
             ORDER BY j.id ASC"
        );
        sqlx::query_scalar::<_, JobId>(&sql)
            .bind(JobStatus::Running)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list stale jobs", e)
            })
    }
}
