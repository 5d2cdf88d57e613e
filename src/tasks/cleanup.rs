//! Expiration Sweep Task
//!
//! Background task that periodically deletes expired cache entries from disk,
//! including entries nobody ever reads again.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::CacheInner;

/// Spawns the expiration sweeper.
///
/// The first sweep runs immediately, then one per `cleanup_interval`. Sweeps
/// never overlap: a tick missed while a sweep is still running is skipped.
/// The task exits once the cache's shutdown token is cancelled.
pub(crate) fn spawn_cleanup_task(inner: Arc<CacheInner>) -> JoinHandle<()> {
    let interval = inner.config.cleanup_interval;

    tokio::spawn(async move {
        info!(?interval, "Starting expiration sweep task");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = inner.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let removed = inner.sweep_expired().await;

            if removed > 0 {
                info!("Expiration sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiration sweep: no expired entries found");
            }
        }

        debug!("Expiration sweep task stopped");
    })
}
