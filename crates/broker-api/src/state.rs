//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use broker_core::config::AppConfig;
use broker_database::StoreManager;
use broker_service::Scheduler;
use broker_storage::LogStoreManager;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. Cloning is cheap:
/// every field is an `Arc` or a handle over `Arc`s.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Job store backend.
    pub stores: StoreManager,
    /// Logfile blob store.
    pub logs: LogStoreManager,
    /// Dispatch engine.
    pub scheduler: Scheduler,
    /// When the process started serving.
    pub started_at: Instant,
}

impl AppState {
    /// Wire the scheduler over the given backends.
    pub fn new(config: AppConfig, stores: StoreManager, logs: LogStoreManager) -> Self {
        let scheduler = Scheduler::from_managers(&stores, Arc::new(logs.clone()));
        Self {
            config: Arc::new(config),
            stores,
            logs,
            scheduler,
            started_at: Instant::now(),
        }
    }
}
