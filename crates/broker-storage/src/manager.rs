//! Logfile store manager that dispatches to the configured provider.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use broker_core::config::StorageConfig;
use broker_core::error::AppError;
use broker_core::result::AppResult;
use broker_core::traits::storage::LogStore;
use broker_core::types::LogfileHandle;

/// Wraps the logfile provider selected at construction time.
#[derive(Debug, Clone)]
pub struct LogStoreManager {
    inner: Arc<dyn LogStore>,
}

impl LogStoreManager {
    /// Create a manager from configuration.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        let inner: Arc<dyn LogStore> = match config.provider.as_str() {
            #[cfg(feature = "local")]
            "local" => {
                info!(root = %config.local.root_path, "Initializing local logfile storage");
                Arc::new(crate::providers::LocalLogStore::new(&config.local.root_path).await?)
            }
            "memory" => {
                info!("Initializing in-memory logfile storage");
                Arc::new(crate::providers::MemoryLogStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown storage provider: '{other}'. Supported: local, memory"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn LogStore>) -> Self {
        Self { inner: provider }
    }

    /// Get a reference to the inner provider.
    pub fn provider(&self) -> &dyn LogStore {
        self.inner.as_ref()
    }
}

#[async_trait]
impl LogStore for LogStoreManager {
    fn provider_type(&self) -> &str {
        self.inner.provider_type()
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn allocate_handle(&self) -> AppResult<LogfileHandle> {
        self.inner.allocate_handle().await
    }

    async fn write(&self, handle: &LogfileHandle, data: Bytes) -> AppResult<u64> {
        self.inner.write(handle, data).await
    }

    async fn read(&self, handle: &LogfileHandle) -> AppResult<Bytes> {
        self.inner.read(handle).await
    }

    async fn delete(&self, handle: &LogfileHandle) -> AppResult<()> {
        self.inner.delete(handle).await
    }

    async fn exists(&self, handle: &LogfileHandle) -> AppResult<bool> {
        self.inner.exists(handle).await
    }
}
