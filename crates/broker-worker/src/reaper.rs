//! Lease reaper: periodically expires claims whose runner went silent.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info};

use broker_core::config::LeaseConfig;
use broker_core::result::AppResult;
use broker_core::types::JobId;
use broker_service::Scheduler;

/// Sweeps for RUNNING jobs older than the lease and marks them UNKNOWN.
#[derive(Debug, Clone)]
pub struct LeaseReaper {
    scheduler: Scheduler,
    timeout: Duration,
    sweep_interval: Duration,
}

impl LeaseReaper {
    /// Create a reaper using the lease settings from configuration.
    pub fn new(scheduler: Scheduler, config: &LeaseConfig) -> Self {
        Self {
            scheduler,
            timeout: config.timeout(),
            sweep_interval: config.sweep_interval(),
        }
    }

    /// Run one sweep, returning the jobs that were expired.
    pub async fn sweep_once(&self) -> AppResult<Vec<JobId>> {
        let expired = self.scheduler.expire_stale_leases(self.timeout).await?;
        if expired.is_empty() {
            debug!("Lease sweep found no stale jobs");
        } else {
            info!(count = expired.len(), "Lease sweep expired jobs");
        }
        Ok(expired)
    }

    /// Sweep until the cancel signal flips to `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            timeout_seconds = self.timeout.as_secs(),
            sweep_interval_seconds = self.sweep_interval.as_secs(),
            "Lease reaper started"
        );

        loop {
            if let Err(e) = self.sweep_once().await {
                error!(error = %e, "Lease sweep failed");
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(self.sweep_interval) => {}
            }
        }

        info!("Lease reaper stopped");
    }

    /// Spawn the reaper loop onto the runtime.
    pub fn spawn(self, cancel: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
