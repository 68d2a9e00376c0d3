//! Job status event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::JobStatus;

/// One immutable entry in a job's status history.
///
/// Events are ordered by `sequence`, which is strictly increasing per job.
/// `recorded_at` is informational (and drives lease expiry) but never
/// used for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct JobEvent {
    /// Per-job monotonic sequence number, starting at 1.
    pub sequence: i64,
    /// Status the job entered with this event.
    pub status: JobStatus,
    /// When the event was appended.
    pub recorded_at: DateTime<Utc>,
}

impl JobEvent {
    /// Build an event stamped with the current time.
    pub fn now(sequence: i64, status: JobStatus) -> Self {
        Self {
            sequence,
            status,
            recorded_at: Utc::now(),
        }
    }
}
