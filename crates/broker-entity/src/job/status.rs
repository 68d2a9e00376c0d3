//! Job status enumeration and the transition rules between statuses.

use std::fmt;
use std::str::FromStr;

use broker_core::error::AppError;
use serde::{Deserialize, Serialize};

/// Status of a job, stored as its ordinal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i16)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Runner stopped reporting (heartbeat or connectivity lost).
    Unknown = 0,
    /// Deferred. Only reachable through an explicit status update.
    Sleeping = 1,
    /// Eligible for dispatch.
    Waiting = 2,
    /// Claimed by a runner and executing.
    Running = 3,
    /// Ended abnormally.
    Terminated = 4,
    /// Ended successfully.
    Done = 5,
}

impl JobStatus {
    /// Every status in ordinal order.
    pub const ALL: [JobStatus; 6] = [
        Self::Unknown,
        Self::Sleeping,
        Self::Waiting,
        Self::Running,
        Self::Terminated,
        Self::Done,
    ];

    /// Return the status ordinal.
    pub fn ordinal(self) -> i16 {
        self as i16
    }

    /// Look a status up by ordinal.
    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| i64::from(s.ordinal()) == ordinal)
    }

    /// Parse a raw status token as sent by runners: either the exact
    /// upper-case name or the ordinal integer.
    pub fn from_token(token: &serde_json::Value) -> Result<Self, AppError> {
        match token {
            serde_json::Value::String(name) => name.parse(),
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(Self::from_ordinal)
                .ok_or_else(|| AppError::invalid_status(format!("Invalid value for status {n}"))),
            other => Err(AppError::invalid_status(format!(
                "Invalid value for status {other}"
            ))),
        }
    }

    /// Return the status as its upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Sleeping => "SLEEPING",
            Self::Waiting => "WAITING",
            Self::Running => "RUNNING",
            Self::Terminated => "TERMINATED",
            Self::Done => "DONE",
        }
    }

    /// WAITING or RUNNING: the jobs users and runners still care about.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Waiting | Self::Running)
    }

    /// DONE or TERMINATED: never dispatched again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Terminated)
    }

    /// Whether a job in `self` may move to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Waiting, Running)
                | (Running, Done | Terminated | Unknown)
                | (Unknown, Running | Terminated)
                | (Sleeping, Waiting)
        )
    }

    /// Like [`can_transition_to`](Self::can_transition_to) but produces the
    /// `IllegalTransition` error callers surface.
    pub fn ensure_transition(self, next: Self) -> Result<(), AppError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::illegal_transition(format!(
                "Cannot move job from {self} to {next}"
            )))
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::invalid_status(format!("Invalid value for status {s}")))
    }
}
