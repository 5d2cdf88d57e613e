//! File Cache - A file-backed key/value cache
//!
//! Stores byte payloads on disk with absolute or sliding expiration, a
//! background expiration sweep and an asynchronous refresh queue.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{DistributedCache, EntryOptions, FileCache};
pub use config::Config;
pub use error::{CacheError, Result};
