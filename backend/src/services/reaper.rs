use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::services::lifecycle::{LifecycleError, RequestLifecycle};

/// Periodically returns stale in-progress requests to the pending pool.
pub struct StaleAssignmentReaper {
    lifecycle: RequestLifecycle,
    interval: Duration,
}

impl StaleAssignmentReaper {
    pub fn new(lifecycle: RequestLifecycle, interval_secs: u64) -> Self {
        Self {
            lifecycle,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Runs until the task is dropped. Failed sweeps are logged and retried
    /// on the next tick.
    pub async fn start(self) {
        info!(
            "Starting stale assignment reaper (interval: {:?}, timeout: {})",
            self.interval,
            self.lifecycle.policy().assignment_timeout
        );

        loop {
            tokio::time::sleep(self.interval).await;

            match self.run_once().await {
                Ok(0) => debug!("reaper sweep found nothing stale"),
                Ok(reverted) => info!(reverted, "reaper sweep complete"),
                Err(e) => warn!("reaper sweep failed: {:?}", e),
            }
        }
    }

    pub async fn run_once(&self) -> Result<u64, LifecycleError> {
        self.lifecycle.sweep_stale(Utc::now()).await
    }
}
