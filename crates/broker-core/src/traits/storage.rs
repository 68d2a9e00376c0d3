//! Blob store trait for job logfiles.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;
use crate::types::LogfileHandle;

/// Trait for logfile blob backends.
///
/// Implementations exist for the local filesystem and for process memory.
/// The trait is defined here in `broker-core` and implemented in
/// `broker-storage`.
#[async_trait]
pub trait LogStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Produce a fresh handle that does not name any stored blob.
    async fn allocate_handle(&self) -> AppResult<LogfileHandle>;

    /// Store `data` under `handle`, replacing nothing; returns bytes written.
    async fn write(&self, handle: &LogfileHandle, data: Bytes) -> AppResult<u64>;

    /// Read the full blob stored under `handle`.
    async fn read(&self, handle: &LogfileHandle) -> AppResult<Bytes>;

    /// Delete the blob stored under `handle`. Missing blobs are not an error.
    async fn delete(&self, handle: &LogfileHandle) -> AppResult<()>;

    /// Whether a blob exists under `handle`.
    async fn exists(&self, handle: &LogfileHandle) -> AppResult<bool>;
}
