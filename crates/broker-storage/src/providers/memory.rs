//! In-memory logfile provider backed by a concurrent map.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use broker_core::error::AppError;
use broker_core::result::AppResult;
use broker_core::traits::storage::LogStore;
use broker_core::types::LogfileHandle;

/// Keeps logfiles in a [`DashMap`]. Contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    blobs: Arc<DashMap<LogfileHandle, Bytes>>,
}

impl MemoryLogStore {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored logfiles.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether no logfiles are stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn allocate_handle(&self) -> AppResult<LogfileHandle> {
        loop {
            let handle = LogfileHandle::generate();
            if !self.blobs.contains_key(&handle) {
                return Ok(handle);
            }
        }
    }

    async fn write(&self, handle: &LogfileHandle, data: Bytes) -> AppResult<u64> {
        match self.blobs.entry(handle.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Logfile {handle} already exists"
            ))),
            Entry::Vacant(slot) => {
                let len = data.len() as u64;
                slot.insert(data);
                Ok(len)
            }
        }
    }

    async fn read(&self, handle: &LogfileHandle) -> AppResult<Bytes> {
        self.blobs
            .get(handle)
            .map(|blob| blob.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Logfile {handle} not found")))
    }

    async fn delete(&self, handle: &LogfileHandle) -> AppResult<()> {
        self.blobs.remove(handle);
        Ok(())
    }

    async fn exists(&self, handle: &LogfileHandle) -> AppResult<bool> {
        Ok(self.blobs.contains_key(handle))
    }
}
