//! Key Lock Module
//!
//! Per-key mutual exclusion. Every read or write of a key's files happens
//! while holding that key's handle.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Handle = Arc<Mutex<()>>;

// == Key Locks ==
/// Lazily populated table of one lock handle per key.
#[derive(Debug, Default)]
pub struct KeyLocks {
    table: DashMap<String, Handle>,
}

/// Exclusive access to one key, released on drop.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    handle: Handle,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the key's handle, installing a fresh one if absent.
    fn get_or_create(&self, key: &str) -> Handle {
        // Shard guard is dropped at the end of the statement, never held across an await
        self.table
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn get(&self, key: &str) -> Option<Handle> {
        self.table.get(key).map(|entry| entry.value().clone())
    }

    fn is_current(&self, key: &str, handle: &Handle) -> bool {
        self.table
            .get(key)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), handle))
    }

    // == Lock ==
    /// Acquires the key's lock, creating the handle on first use.
    ///
    /// A handle released while we waited on it is stale; we retry with the
    /// handle now installed so a key is never served by two live handles.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        loop {
            let handle = self.get_or_create(key);
            let guard = handle.clone().lock_owned().await;
            if self.is_current(key, &handle) {
                return KeyGuard {
                    key: key.to_string(),
                    handle,
                    _guard: guard,
                };
            }
        }
    }

    /// Acquires the key's lock only if a handle already exists.
    pub async fn lock_existing(&self, key: &str) -> Option<KeyGuard> {
        let handle = self.get(key)?;
        let guard = handle.clone().lock_owned().await;
        if !self.is_current(key, &handle) {
            return None;
        }
        Some(KeyGuard {
            key: key.to_string(),
            handle,
            _guard: guard,
        })
    }

    // == Release ==
    /// Drops the key from the table, then unlocks.
    ///
    /// Call only once the key's files are gone. Waiters on the old handle
    /// notice it is no longer current and move to a new one.
    pub fn release(&self, guard: KeyGuard) {
        self.table
            .remove_if(&guard.key, |_, handle| Arc::ptr_eq(handle, &guard.handle));
        drop(guard);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
