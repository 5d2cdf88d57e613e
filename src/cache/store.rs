//! Cache Store Module
//!
//! The file cache facade: combines the disk store, the per-key lock table,
//! the refresh queue and the error log, and owns the two background tasks.
//!
//! Public operations never fail. Errors are written to the error log and
//! turned into a benign result: `get` returns `None`, the rest do nothing.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{
    validate_key, CacheStats, DiskStore, EntryOptions, EntryRecord, ErrorLog, KeyLocks,
    RefreshQueue, StatsCounters,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_cleanup_task, spawn_refresh_worker};

// == Cache Inner ==
/// State shared between the facade and the background tasks.
#[derive(Debug)]
pub(crate) struct CacheInner {
    pub(crate) config: Config,
    pub(crate) disk: DiskStore,
    pub(crate) locks: KeyLocks,
    pub(crate) refresh: RefreshQueue,
    pub(crate) errors: ErrorLog,
    pub(crate) stats: StatsCounters,
    pub(crate) shutdown: CancellationToken,
}

impl CacheInner {
    pub(crate) fn log(&self, operation: &str, key: Option<&str>, err: &CacheError) {
        self.stats.record_error();
        self.errors.record(operation, key, err);
    }

    async fn try_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let guard = self.locks.lock(key).await;

        let Some(record) = self.disk.read_record(key).await? else {
            // A payload left without its record is unreachable
            self.disk.delete(key).await?;
            self.locks.release(guard);
            return Ok(None);
        };

        if record.is_expired_at(Utc::now()) {
            self.disk.delete(key).await?;
            self.locks.release(guard);
            self.stats.record_expired();
            debug!(key, "removed expired entry on read");
            return Ok(None);
        }

        match self.disk.read_payload(key).await? {
            Some(payload) => Ok(Some(payload)),
            None => {
                // Drop the lone record so the pair invariant holds again
                self.disk.delete(key).await?;
                self.locks.release(guard);
                Err(CacheError::MissingPayload(key.to_string()))
            }
        }
    }

    async fn try_set(&self, key: &str, payload: &[u8], options: &EntryOptions) -> Result<()> {
        validate_key(key)?;
        let _guard = self.locks.lock(key).await;
        let record = EntryRecord::from_options(options, Utc::now(), self.config.default_ttl);

        let written = match self.disk.write_record(key, &record).await {
            Ok(()) => self.disk.write_payload(key, payload).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = self.disk.delete(key).await {
                self.log("set", Some(key), &cleanup);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn try_remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let guard = self.locks.lock(key).await;
        self.disk.delete(key).await?;
        self.locks.release(guard);
        Ok(())
    }

    // == Refresh Entry ==
    /// Applies one queued sliding extension. Returns whether the record changed.
    ///
    /// Keys without a lock handle were removed in the meantime and are skipped.
    pub(crate) async fn refresh_entry(&self, key: &str) -> Result<bool> {
        let Some(_guard) = self.locks.lock_existing(key).await else {
            return Ok(false);
        };
        let Some(mut record) = self.disk.read_record(key).await? else {
            return Ok(false);
        };
        if !record.refreshed_at(Utc::now()) {
            return Ok(false);
        }

        self.disk.write_record(key, &record).await?;
        self.stats.record_refresh();
        Ok(true)
    }

    // == Sweep ==
    /// Deletes every expired entry on disk, one key at a time.
    ///
    /// Failures on a key are logged and the scan moves on. Stops early once
    /// shutdown has started.
    pub(crate) async fn sweep_expired(&self) -> usize {
        let keys = match self.disk.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                self.log("sweep", None, &e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys {
            if self.shutdown.is_cancelled() {
                debug!("sweep interrupted by shutdown");
                break;
            }
            match self.sweep_key(&key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => self.log("sweep", Some(&key), &e),
            }
        }

        self.stats.record_sweep();
        removed
    }

    async fn sweep_key(&self, key: &str) -> Result<bool> {
        let guard = self.locks.lock(key).await;

        let Some(record) = self.disk.read_record(key).await? else {
            // Removed between listing and locking
            self.locks.release(guard);
            return Ok(false);
        };
        if !record.is_expired_at(Utc::now()) {
            return Ok(false);
        }

        self.disk.delete(key).await?;
        self.locks.release(guard);
        self.stats.record_expired();
        Ok(true)
    }
}

// == File Cache ==
/// File-backed key/value cache with absolute and sliding expiration.
///
/// Must be opened inside a tokio runtime. Dropping the cache stops its
/// background tasks; `shutdown` does the same and waits for them.
#[derive(Debug)]
pub struct FileCache {
    inner: Arc<CacheInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl FileCache {
    // == Constructor ==
    /// Opens the cache rooted at `config.cache_path`.
    ///
    /// Creates the directories, opens the error log and starts the
    /// expiration sweeper (first sweep runs immediately) and refresh worker.
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let disk = DiskStore::open(&config.cache_path).await?;
        let errors = ErrorLog::open(disk.root())?;

        let inner = Arc::new(CacheInner {
            config,
            disk,
            locks: KeyLocks::new(),
            refresh: RefreshQueue::new(),
            errors,
            stats: StatsCounters::new(),
            shutdown: CancellationToken::new(),
        });

        let tasks = vec![
            spawn_cleanup_task(inner.clone()),
            spawn_refresh_worker(inner.clone()),
        ];

        info!(
            path = %inner.disk.root().display(),
            cleanup_interval = ?inner.config.cleanup_interval,
            "file cache opened"
        );

        Ok(Self {
            inner,
            tasks: Mutex::new(tasks),
        })
    }

    // == Get ==
    /// Returns the stored payload, or `None` if absent or expired.
    ///
    /// An expired entry is deleted before returning.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.inner.try_get(key).await {
            Ok(Some(payload)) => {
                self.inner.stats.record_hit();
                Some(payload)
            }
            Ok(None) => {
                self.inner.stats.record_miss();
                None
            }
            Err(e) => {
                self.inner.stats.record_miss();
                self.inner.log("get", Some(key), &e);
                None
            }
        }
    }

    // == Set ==
    /// Stores `payload` under `key`, overwriting any previous entry.
    pub async fn set(&self, key: &str, payload: &[u8], options: &EntryOptions) {
        if let Err(e) = self.inner.try_set(key, payload, options).await {
            self.inner.log("set", Some(key), &e);
        }
    }

    // == Refresh ==
    /// Queues a sliding-expiration extension for `key`. Never blocks on I/O.
    pub fn refresh(&self, key: &str) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        if let Err(e) = validate_key(key) {
            self.inner.log("refresh", Some(key), &e);
            return;
        }
        if !self.inner.refresh.push(key) {
            debug!(key, "refresh already pending");
        }
    }

    // == Remove ==
    /// Deletes `key`. Removing an absent key is a no-op.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.inner.try_remove(key).await {
            self.inner.log("remove", Some(key), &e);
        }
    }

    /// Runs one expiration sweep now and returns the number of entries removed.
    pub async fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired().await
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot()
    }

    /// Number of keys waiting for the refresh worker.
    pub fn pending_refreshes(&self) -> usize {
        self.inner.refresh.len()
    }

    /// Number of keys currently holding a lock handle.
    pub fn tracked_keys(&self) -> usize {
        self.inner.locks.len()
    }

    pub fn root(&self) -> &Path {
        self.inner.disk.root()
    }

    // == Shutdown ==
    /// Stops the background tasks and waits for them to finish.
    ///
    /// Operations already holding a key lock complete normally.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.refresh.clear();

        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            tasks.drain(..).collect()
        };
        for task in tasks {
            if let Err(e) = task.await {
                debug!(error = %e, "background task ended abnormally");
            }
        }
        info!("file cache shut down");
    }
}

impl Drop for FileCache {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}
