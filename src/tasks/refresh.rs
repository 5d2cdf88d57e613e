//! Refresh Worker Task
//!
//! Single consumer of the refresh queue: extends sliding entries off the
//! caller's path.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheInner;

/// Spawns the refresh worker.
///
/// Takes one key at a time and pauses `refresh_yield` between keys. When the
/// queue is empty it waits up to `refresh_idle_backoff` for new work. A failed
/// refresh is logged and the loop carries on. Exits once shutdown is cancelled.
pub(crate) fn spawn_refresh_worker(inner: Arc<CacheInner>) -> JoinHandle<()> {
    let idle_backoff = inner.config.refresh_idle_backoff;
    let pause = inner.config.refresh_yield;

    tokio::spawn(async move {
        info!(?idle_backoff, "Starting refresh worker");

        while !inner.shutdown.is_cancelled() {
            let Some(key) = inner.refresh.pop() else {
                tokio::select! {
                    biased;
                    _ = inner.shutdown.cancelled() => break,
                    _ = inner.refresh.wait(idle_backoff) => {}
                }
                continue;
            };

            match inner.refresh_entry(&key).await {
                Ok(true) => debug!(key = %key, "sliding expiration extended"),
                Ok(false) => debug!(key = %key, "refresh skipped"),
                Err(e) => inner.log("refresh", Some(&key), &e),
            }

            if pause.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    biased;
                    _ = inner.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        debug!("Refresh worker stopped");
    })
}
