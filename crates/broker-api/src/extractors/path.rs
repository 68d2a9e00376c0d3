//! Typed path parameter helpers.

use broker_core::error::AppError;
use broker_core::types::JobId;

/// Parses a job identifier from a path segment.
pub fn parse_job_id(s: &str) -> Result<JobId, AppError> {
    s.parse::<JobId>()
}
