//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default interval between expiration sweeps (30 minutes)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Default lifetime of entries stored without any expiration option
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// How long the refresh worker waits when its queue is empty
pub const DEFAULT_REFRESH_IDLE_BACKOFF: Duration = Duration::from_secs(1);

/// Pause between two consecutive refreshes
pub const DEFAULT_REFRESH_YIELD: Duration = Duration::from_millis(10);

/// File cache configuration parameters.
///
/// Only `cache_path` is required; everything else has a sensible default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding the record and payload directories and the error log
    pub cache_path: PathBuf,
    /// Interval between expiration sweeps
    pub cleanup_interval: Duration,
    /// Lifetime of entries written without an expiration option
    pub default_ttl: Duration,
    /// Refresh worker backoff while the queue is empty
    pub refresh_idle_backoff: Duration,
    /// Refresh worker pause between two dequeues
    pub refresh_yield: Duration,
}

impl Config {
    /// Creates a configuration rooted at `cache_path` with default timings.
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            default_ttl: DEFAULT_TTL,
            refresh_idle_backoff: DEFAULT_REFRESH_IDLE_BACKOFF,
            refresh_yield: DEFAULT_REFRESH_YIELD,
        }
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FILE_CACHE_PATH` - Cache root directory (default: ./file_cache)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1800)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `REFRESH_IDLE_MS` - Refresh worker idle backoff in milliseconds (default: 1000)
    pub fn from_env() -> Self {
        let cache_path = env::var("FILE_CACHE_PATH").unwrap_or_else(|_| "./file_cache".to_string());
        let mut config = Self::new(cache_path);

        if let Some(secs) = parse_env::<u64>("CLEANUP_INTERVAL") {
            config.cleanup_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("DEFAULT_TTL") {
            config.default_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_env::<u64>("REFRESH_IDLE_MS") {
            config.refresh_idle_backoff = Duration::from_millis(ms);
        }

        config
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_refresh_idle_backoff(mut self, backoff: Duration) -> Self {
        self.refresh_idle_backoff = backoff;
        self
    }

    pub fn with_refresh_yield(mut self, pause: Duration) -> Self {
        self.refresh_yield = pause;
        self
    }

    /// Checks the values the background tasks cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache_path.as_os_str().is_empty() {
            return Err(CacheError::Config("cache path must not be empty".to_string()));
        }
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::Config(
                "cleanup interval must be greater than zero".to_string(),
            ));
        }
        if self.refresh_idle_backoff.is_zero() {
            return Err(CacheError::Config(
                "refresh idle backoff must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
