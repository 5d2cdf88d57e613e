//! Background Tasks Module
//!
//! Contains the background tasks owned by an open file cache.
//!
//! # Tasks
//! - Expiration sweep: deletes expired entries at the configured interval
//! - Refresh worker: applies queued sliding-expiration extensions

mod cleanup;
mod refresh;

pub(crate) use cleanup::spawn_cleanup_task;
pub(crate) use refresh::spawn_refresh_worker;
