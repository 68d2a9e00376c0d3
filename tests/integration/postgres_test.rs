//! Integration tests against a live PostgreSQL job store.
//!
//! Run with `DATABASE_URL=postgres://... cargo test --test postgres_test -- --ignored`.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use broker_core::config::{DatabaseBackend, DatabaseConfig};
use broker_core::error::ErrorKind;
use broker_core::types::JobId;
use broker_database::repositories::{EventRepository, JobRepository};
use broker_database::{DatabasePool, StoreManager, migration};
use broker_entity::job::{JobStatus, NewJob};
use broker_service::Scheduler;
use broker_storage::providers::MemoryLogStore;

/// Tests share one database and truncate it, so they run one at a time.
static DATABASE: Mutex<()> = Mutex::const_new(());

async fn scheduler() -> (Scheduler, DatabasePool, MutexGuard<'static, ()>) {
    let guard = DATABASE.lock().await;
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let config = DatabaseConfig {
        backend: DatabaseBackend::Postgres,
        url,
        ..DatabaseConfig::default()
    };

    let pool = DatabasePool::connect(&config)
        .await
        .expect("Failed to connect to test database");
    migration::run_migrations(pool.pool())
        .await
        .expect("Failed to run migrations");
    sqlx::query("TRUNCATE job_events, jobs RESTART IDENTITY")
        .execute(pool.pool())
        .await
        .expect("Failed to clean tables");

    let stores = StoreManager::from_parts(
        Arc::new(JobRepository::new(pool.pool().clone())),
        Arc::new(EventRepository::new(pool.pool().clone())),
    );
    let scheduler = Scheduler::from_managers(&stores, Arc::new(MemoryLogStore::new()));
    (scheduler, pool, guard)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_lifecycle_round_trip() {
    let (scheduler, _pool, _guard) = scheduler().await;

    let job = scheduler
        .submit(NewJob::new("alice", "nightly", "make all"))
        .await
        .expect("submit");
    assert_eq!(job.current_status(), JobStatus::Waiting);

    let claimed = scheduler
        .claim_next()
        .await
        .expect("claim")
        .expect("a waiting job");
    assert_eq!(claimed.identifier, job.identifier);
    assert_eq!(claimed.current_status(), JobStatus::Running);

    scheduler
        .update_status(job.identifier, &serde_json::json!(5))
        .await
        .expect("done");
    let err = scheduler
        .set_status(job.identifier, JobStatus::Running)
        .await
        .expect_err("DONE is terminal");
    assert_eq!(err.kind, ErrorKind::IllegalTransition);

    let history = scheduler.history(job.identifier).await.expect("history");
    let statuses: Vec<JobStatus> = history.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![JobStatus::Waiting, JobStatus::Running, JobStatus::Done]
    );
    assert!(history.windows(2).all(|w| w[0].sequence < w[1].sequence));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_claims_are_exclusive() {
    let (scheduler, _pool, _guard) = scheduler().await;
    for i in 0..8 {
        scheduler
            .submit(NewJob::new("bob", "batch", format!("echo {i}")))
            .await
            .expect("submit");
    }

    let mut handles = Vec::new();
    for _ in 0..20 {
        let scheduler = scheduler.clone();
        handles.push(tokio::spawn(async move { scheduler.claim_next().await }));
    }

    let mut claimed = HashSet::new();
    for handle in handles {
        if let Some(job) = handle.await.expect("task").expect("claim") {
            assert!(claimed.insert(job.identifier));
        }
    }
    assert_eq!(claimed.len(), 8);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_logfile_handle_is_set_once_and_delete_cascades() {
    let (scheduler, pool, _guard) = scheduler().await;
    let job = scheduler
        .submit(NewJob::new("carol", "report", "./report.sh"))
        .await
        .expect("submit");

    scheduler
        .upload_logfile(job.identifier, bytes::Bytes::from_static(b"ok"))
        .await
        .expect("upload");
    let err = scheduler
        .attach_logfile(job.identifier)
        .await
        .expect_err("second attach");
    assert_eq!(err.kind, ErrorKind::Conflict);

    scheduler.remove(job.identifier).await.expect("remove");
    let (events,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM job_events WHERE job_id = $1")
        .bind(job.identifier.get())
        .fetch_one(pool.pool())
        .await
        .expect("count");
    assert_eq!(events, 0);

    let missing = scheduler
        .get_job(JobId::new(job.identifier.get()))
        .await
        .expect_err("removed");
    assert!(missing.is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_reads_see_one_snapshot_under_churn() {
    let (scheduler, _pool, _guard) = scheduler().await;
    let stop = Arc::new(AtomicBool::new(false));

    let mut churners = Vec::new();
    for worker in 0..3 {
        let scheduler = scheduler.clone();
        let stop = Arc::clone(&stop);
        churners.push(tokio::spawn(async move {
            let mut n = 0;
            while !stop.load(Ordering::Relaxed) {
                n += 1;
                scheduler
                    .submit(NewJob::new("churn", "cycle", format!("echo {worker}-{n}")))
                    .await
                    .expect("submit");
                if let Some(job) = scheduler.claim_next().await.expect("claim") {
                    scheduler
                        .set_status(job.identifier, JobStatus::Done)
                        .await
                        .expect("done");
                    scheduler.remove(job.identifier).await.expect("remove");
                }
            }
        }));
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    let mut lists = 0;
    while tokio::time::Instant::now() < deadline {
        for job in scheduler.list_jobs(true, None).await.expect("list") {
            assert!(!job.events.is_empty(), "job #{} has no events", job.identifier);
            assert!(
                job.is_active(),
                "job #{} is {} in the active list",
                job.identifier,
                job.current_status()
            );
            match scheduler.get_job(job.identifier).await {
                Ok(fresh) => assert!(!fresh.events.is_empty()),
                Err(e) => assert!(e.is_not_found()),
            }
        }
        lists += 1;
    }

    stop.store(true, Ordering::Relaxed);
    for churner in churners {
        churner.await.expect("churn task");
    }
    assert!(lists > 0);
}
