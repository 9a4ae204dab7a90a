//! Periodic expiry sweep.
//!
//! An owned background task with an explicit handle (wake + shutdown) rather
//! than a free-running global timer, so tests and shutdown paths drive it
//! deterministically. The sweep is the only place bulk deletion happens;
//! individual reads evict from memory but never delete durable rows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Notify};
use tracing::{debug, info};

use crate::cache::PadCache;

/// Default sweep cadence.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Handle returned to the caller so it can request an immediate sweep or
/// shut the loop down.
pub struct SweepHandle {
    /// Notify to run a sweep now instead of waiting out the interval.
    pub wake: Arc<Notify>,
    /// Send `true` to shut down.
    pub shutdown_tx: watch::Sender<bool>,
}

/// Spawn the sweep loop as a tokio task.
pub fn spawn_sweep(
    cache: Arc<PadCache>,
    interval: Duration,
) -> (tokio::task::JoinHandle<()>, SweepHandle) {
    let wake = Arc::new(Notify::new());
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let wake_clone = wake.clone();

    let handle = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "expiry sweep started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = wake_clone.notified() => {
                    debug!("expiry sweep woken early");
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("expiry sweep shutting down");
                        return;
                    }
                }
            }

            // Check shutdown again after wakeup.
            if *shutdown_rx.borrow() {
                return;
            }

            cache.sweep_once(Utc::now()).await;
        }
    });

    (handle, SweepHandle { wake, shutdown_tx })
}
