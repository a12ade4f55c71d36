//! Periodic threshold refresh loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::cache::ThresholdCache;

/// Spawn the refresh loop.
///
/// Refreshes the whole cache every `interval` until `shutdown` flips to
/// true or its sender is dropped. A failed refresh is logged; the previous
/// cache content stays in place and the next tick retries.
pub fn spawn_refresh_loop(
    cache: Arc<ThresholdCache>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; the caller already did the
        // boot-time refresh.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = cache.refresh_all().await {
                        error!("Periodic threshold refresh failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("Threshold refresh loop stopped");
    })
}
