//! Cycle scheduler - runs reconciliation cycles one after another
//!
//! The [`CycleScheduler`] is the caller the engine expects: it runs
//! [`Reconciler::run_cycle`] on a fixed interval, never overlapping two
//! cycles, and retries store failures at the next cycle with backoff.
//!
//! ## Flow
//!
//! ```text
//! interval / request_now() ──→ run_cycle() ──→ Ok: wait interval
//!                                         └─→ retryable Err: wait backoff
//! CancellationToken ──→ stop
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use vaultsync_core::config::ReconcileConfig;

use crate::engine::Reconciler;

/// Delay before the next attempt after `failures` consecutive store failures
///
/// `base * 2^(failures-1)`, never more than `cap`.
pub fn backoff_delay(base: Duration, failures: u32, cap: Duration) -> Duration {
    let exponent = failures.saturating_sub(1).min(31);
    base.saturating_mul(1u32 << exponent).min(cap)
}

/// Runs serialized reconciliation cycles until cancelled
pub struct CycleScheduler {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    failure_backoff: Duration,
    cancel: CancellationToken,
    wake: Notify,
}

impl CycleScheduler {
    pub fn new(
        reconciler: Arc<Reconciler>,
        interval: Duration,
        failure_backoff: Duration,
        cancel: CancellationToken,
    ) -> Self {
        info!(
            interval_secs = interval.as_secs(),
            backoff_secs = failure_backoff.as_secs(),
            "Creating cycle scheduler"
        );
        Self {
            reconciler,
            interval,
            failure_backoff,
            cancel,
            wake: Notify::new(),
        }
    }

    pub fn from_config(
        reconciler: Arc<Reconciler>,
        config: &ReconcileConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(
            reconciler,
            Duration::from_secs(config.interval_secs),
            Duration::from_secs(config.failure_backoff_secs),
            cancel,
        )
    }

    /// Starts the next cycle without waiting for the interval
    ///
    /// A request made while a cycle is running starts another one right
    /// after it.
    pub fn request_now(&self) {
        info!("Immediate cycle requested");
        self.wake.notify_one();
    }

    /// Main loop; returns once the cancellation token fires
    pub async fn run(&self) {
        info!("Cycle scheduler starting");
        let mut failures: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let delay = match self.reconciler.run_cycle().await {
                Ok(report) => {
                    failures = 0;
                    debug!(cycle_id = %report.cycle_id, "Cycle finished");
                    self.interval
                }
                Err(e) if e.is_retryable() => {
                    failures += 1;
                    let delay = backoff_delay(self.failure_backoff, failures, self.interval);
                    warn!(
                        error = %e,
                        failures,
                        retry_in_secs = delay.as_secs(),
                        "Cycle failed, will retry"
                    );
                    delay
                }
                Err(e) => {
                    failures = 0;
                    error!(error = %e, "Cycle failed");
                    self.interval
                }
            };

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
                _ = self.wake.notified() => {
                    debug!("Woken for immediate cycle");
                }
            }
        }

        info!("Cycle scheduler stopped");
    }
}
