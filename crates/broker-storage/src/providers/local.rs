//! Local filesystem logfile provider.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use broker_core::error::{AppError, ErrorKind};
use broker_core::result::AppResult;
use broker_core::traits::storage::LogStore;
use broker_core::types::LogfileHandle;

/// Stores each logfile as `<root>/<handle>.log`.
#[derive(Debug, Clone)]
pub struct LocalLogStore {
    /// Directory holding every logfile.
    root: PathBuf,
}

impl LocalLogStore {
    /// Create a provider rooted at `root_path`, creating the directory if needed.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create logfile root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Handles are validated hex, so joining them cannot escape the root.
    fn resolve(&self, handle: &LogfileHandle) -> PathBuf {
        self.root.join(format!("{handle}.log"))
    }
}

#[async_trait]
impl LogStore for LocalLogStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false))
    }

    async fn allocate_handle(&self) -> AppResult<LogfileHandle> {
        loop {
            let handle = LogfileHandle::generate();
            if !self.exists(&handle).await? {
                return Ok(handle);
            }
        }
    }

    async fn write(&self, handle: &LogfileHandle, data: Bytes) -> AppResult<u64> {
        let path = self.resolve(handle);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    AppError::conflict(format!("Logfile {handle} already exists"))
                } else {
                    AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to create logfile {handle}"),
                        e,
                    )
                }
            })?;

        file.write_all(&data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write logfile {handle}"), e)
        })?;
        file.flush()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush logfile", e))?;

        debug!(handle = %handle, bytes = data.len(), "Wrote logfile");
        Ok(data.len() as u64)
    }

    async fn read(&self, handle: &LogfileHandle) -> AppResult<Bytes> {
        let data = fs::read(self.resolve(handle)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Logfile {handle} not found"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read logfile {handle}"),
                    e,
                )
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, handle: &LogfileHandle) -> AppResult<()> {
        match fs::remove_file(self.resolve(handle)).await {
            Ok(()) => {
                debug!(handle = %handle, "Deleted logfile");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete logfile {handle}"),
                e,
            )),
        }
    }

    async fn exists(&self, handle: &LogfileHandle) -> AppResult<bool> {
        fs::try_exists(self.resolve(handle)).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to stat logfile {handle}"),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn provider(dir: &tempfile::TempDir) -> LocalLogStore {
        LocalLogStore::new(dir.path().join("logs").to_str().unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = provider(&dir).await;
        assert!(store.health_check().await.unwrap());

        let handle = store.allocate_handle().await.unwrap();
        assert!(!store.exists(&handle).await.unwrap());

        let data = Bytes::from("step 1 ok\nstep 2 ok\n");
        assert_eq!(store.write(&handle, data.clone()).await.unwrap(), data.len() as u64);
        assert!(store.exists(&handle).await.unwrap());
        assert_eq!(store.read(&handle).await.unwrap(), data);

        store.delete(&handle).await.unwrap();
        assert!(!store.exists(&handle).await.unwrap());
        // Deleting twice is fine.
        store.delete(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = provider(&dir).await;
        let handle = store.allocate_handle().await.unwrap();

        store.write(&handle, Bytes::from("first")).await.unwrap();
        let err = store.write(&handle, Bytes::from("second")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(store.read(&handle).await.unwrap(), Bytes::from("first"));
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = provider(&dir).await;
        let err = store.read(&LogfileHandle::generate()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
