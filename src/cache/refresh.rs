//! Refresh Queue Module
//!
//! FIFO of keys waiting for a sliding-expiration extension. Many producers,
//! one consumer (the refresh worker).

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Pending {
    order: VecDeque<String>,
    queued: HashSet<String>,
}

// == Refresh Queue ==
#[derive(Debug, Default)]
pub struct RefreshQueue {
    pending: Mutex<Pending>,
    notify: Notify,
}

impl RefreshQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        // Nothing panics while the lock is held, so a poisoned queue is still consistent.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Push ==
    /// Enqueues `key` unless it is already waiting. Returns whether it was added.
    pub fn push(&self, key: &str) -> bool {
        let added = {
            let mut pending = self.pending();
            if pending.queued.insert(key.to_string()) {
                pending.order.push_back(key.to_string());
                true
            } else {
                false
            }
        };
        if added {
            self.notify.notify_one();
        }
        added
    }

    // == Pop ==
    /// Takes the oldest waiting key.
    pub fn pop(&self) -> Option<String> {
        let mut pending = self.pending();
        let key = pending.order.pop_front()?;
        pending.queued.remove(&key);
        Some(key)
    }

    /// Waits until a key is pushed or `timeout` elapses.
    pub async fn wait(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
    }

    pub fn len(&self) -> usize {
        self.pending().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().order.is_empty()
    }

    pub fn clear(&self) {
        let mut pending = self.pending();
        pending.order.clear();
        pending.queued.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_fifo_order() {
        let queue = RefreshQueue::new();
        queue.push("a");
        queue.push("b");
        queue.push("c");

        assert_eq!(queue.pop().as_deref(), Some("a"));
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert_eq!(queue.pop().as_deref(), Some("c"));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_duplicate_push_is_ignored_while_pending() {
        let queue = RefreshQueue::new();

        assert!(queue.push("a"));
        assert!(!queue.push("a"));
        assert_eq!(queue.len(), 1);

        queue.pop();
        assert!(queue.push("a"), "Key can be queued again once taken");
    }

    #[test]
    fn test_clear() {
        let queue = RefreshQueue::new();
        queue.push("a");
        queue.push("b");

        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.push("a"));
    }

    #[tokio::test]
    async fn test_wait_returns_after_timeout_when_empty() {
        let queue = RefreshQueue::new();
        let started = Instant::now();

        queue.wait(Duration::from_millis(50)).await;
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_wait_wakes_on_push() {
        let queue = Arc::new(RefreshQueue::new());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                queue.wait(Duration::from_secs(5)).await;
                started.elapsed()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push("a");

        let waited = waiter.await.unwrap();
        assert!(waited < Duration::from_secs(5));
    }
}
