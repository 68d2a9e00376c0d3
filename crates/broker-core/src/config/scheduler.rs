//! Dispatch engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Scheduler settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Claim lease settings.
    #[serde(default)]
    pub lease: LeaseConfig,
}

/// Lease applied to claimed jobs.
///
/// When enabled, a RUNNING job whose last status event is older than
/// `timeout_seconds` is moved to UNKNOWN by the background reaper.
///
/// There is no heartbeat: RUNNING -> RUNNING is not a legal transition, so
/// a runner cannot extend its lease while the job is RUNNING. Pick a timeout
/// longer than the slowest expected job. A runner whose job was expired
/// re-sends RUNNING (UNKNOWN -> RUNNING) before reporting DONE or
/// TERMINATED; reporting DONE straight from UNKNOWN is rejected with 409.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Whether the reaper runs.
    #[serde(default)]
    pub enabled: bool,
    /// Seconds without a status report before a RUNNING job is considered lost.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Interval in seconds between reaper sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl LeaseConfig {
    /// Lease length as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Sweep interval as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_seconds: default_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    30
}
