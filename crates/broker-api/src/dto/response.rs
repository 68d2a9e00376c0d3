//! Response DTOs.

use serde::{Deserialize, Serialize};

use broker_core::types::{JobId, LogfileHandle};
use broker_service::JobCounts;

/// Result of a logfile upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogfileResponse {
    /// Job the logfile belongs to.
    pub identifier: JobId,
    /// Handle the content is stored under.
    pub logfile_handle: LogfileHandle,
    /// Bytes stored.
    pub size_bytes: u64,
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
}

/// Health of one backing component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Backend or provider name.
    pub backend: String,
    /// Whether the last check succeeded.
    pub healthy: bool,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    /// `"ok"` when every component is healthy, otherwise `"degraded"`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Job store health.
    pub job_store: ComponentHealth,
    /// Logfile store health.
    pub log_store: ComponentHealth,
    /// Job totals, absent if the store could not be counted.
    pub jobs: Option<JobCounts>,
}
