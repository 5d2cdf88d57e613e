//! Cache Module
//!
//! Provides a file-backed cache with absolute and sliding expiration.

mod disk;
mod distributed;
mod entry;
mod error_log;
mod locks;
mod refresh;
mod stats;
mod store;


// Re-export public types
pub use disk::{validate_key, DiskStore};
pub use distributed::DistributedCache;
pub use entry::{EntryOptions, EntryRecord};
pub use error_log::ErrorLog;
pub use locks::{KeyGuard, KeyLocks};
pub use refresh::RefreshQueue;
pub use stats::{CacheStats, StatsCounters};
pub use store::FileCache;

pub(crate) use store::CacheInner;

// == Public Constants ==
/// Maximum allowed key length in bytes, leaving room for the file extension
pub const MAX_KEY_LENGTH: usize = 200;
