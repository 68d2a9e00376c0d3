//! Store manager that dispatches to the configured backend.

use std::sync::Arc;

use tracing::info;

use broker_core::config::{DatabaseBackend, DatabaseConfig};
use broker_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::MemoryJobStore;
use crate::migration::run_migrations;
use crate::repositories::{EventRepository, JobRepository};
use crate::store::{EventLog, JobStore};

/// Holds the job store and event log for the selected backend.
///
/// The backend is chosen at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    jobs: Arc<dyn JobStore>,
    events: Arc<dyn EventLog>,
    pool: Option<DatabasePool>,
}

impl StoreManager {
    /// Connect the backend named in configuration.
    pub async fn new(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend {
            DatabaseBackend::Postgres => {
                info!("Initializing PostgreSQL job store");
                let pool = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(pool.pool()).await?;
                }
                Ok(Self {
                    jobs: Arc::new(JobRepository::new(pool.pool().clone())),
                    events: Arc::new(EventRepository::new(pool.pool().clone())),
                    pool: Some(pool),
                })
            }
            DatabaseBackend::Memory => {
                info!("Initializing in-memory job store");
                Ok(Self::memory())
            }
        }
    }

    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        let store = MemoryJobStore::new();
        Self::from_parts(Arc::new(store.clone()), Arc::new(store))
    }

    /// Build a manager from existing implementations (for testing).
    pub fn from_parts(jobs: Arc<dyn JobStore>, events: Arc<dyn EventLog>) -> Self {
        Self {
            jobs,
            events,
            pool: None,
        }
    }

    /// The job store.
    pub fn jobs(&self) -> Arc<dyn JobStore> {
        Arc::clone(&self.jobs)
    }

    /// The event log.
    pub fn events(&self) -> Arc<dyn EventLog> {
        Arc::clone(&self.events)
    }

    /// Backend name.
    pub fn backend(&self) -> &str {
        self.jobs.backend()
    }

    /// Check whether the backend is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.jobs.health_check().await
    }

    /// Close pooled connections, if any.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
