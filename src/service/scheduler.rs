//! Periodic background refresh of a coordinator.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::coordinator::Coordinator;

/// Spawns a task refreshing `coordinator` every `interval`.
///
/// The first tick fires one full `interval` after spawning, since setup
/// already performed an initial refresh. Each cycle is bounded by
/// `timeout`. Failures are logged and retried on the next tick. The task
/// ends when `shutdown` changes or its sender is dropped, or when the
/// returned handle is aborted.
pub fn spawn_refresh_loop(
    coordinator: Arc<Coordinator>,
    interval: Duration,
    timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let device_id = coordinator.device_id();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        info!(%device_id, ?interval, "refresh loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match coordinator.refresh_with_timeout(timeout).await {
                        Ok(_) => debug!(%device_id, "scheduled refresh succeeded"),
                        Err(e) => warn!(%device_id, error = %e, "scheduled refresh failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!(%device_id, "refresh loop stopped");
                    break;
                }
            }
        }
    })
}
