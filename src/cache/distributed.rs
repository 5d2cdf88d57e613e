//! Distributed Cache Interface
//!
//! The generic get/set/refresh/remove surface the file cache sits behind.

use crate::cache::{EntryOptions, FileCache};

/// Keyed byte-blob cache with expiration.
///
/// Implementations never surface errors: a failed read is a miss, a failed
/// write is a no-op.
#[allow(async_fn_in_trait)]
pub trait DistributedCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    async fn set(&self, key: &str, value: &[u8], options: &EntryOptions);

    async fn refresh(&self, key: &str);

    async fn remove(&self, key: &str);

    /// Reads a UTF-8 value; payloads that are not valid UTF-8 read as absent.
    async fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .await
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    async fn set_string(&self, key: &str, value: &str, options: &EntryOptions) {
        self.set(key, value.as_bytes(), options).await
    }
}

impl DistributedCache for FileCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        FileCache::get(self, key).await
    }

    async fn set(&self, key: &str, value: &[u8], options: &EntryOptions) {
        FileCache::set(self, key, value, options).await
    }

    async fn refresh(&self, key: &str) {
        FileCache::refresh(self, key)
    }

    async fn remove(&self, key: &str) {
        FileCache::remove(self, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn roundtrip<C: DistributedCache>(cache: &C) -> Option<String> {
        cache
            .set_string("greeting", "hello", &EntryOptions::relative(Duration::from_secs(60)))
            .await;
        cache.get_string("greeting").await
    }

    #[tokio::test]
    async fn test_string_helpers_through_trait() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(Config::new(dir.path())).await.unwrap();

        assert_eq!(roundtrip(&cache).await.as_deref(), Some("hello"));

        DistributedCache::remove(&cache, "greeting").await;
        assert!(cache.get_string("greeting").await.is_none());
    }

    #[tokio::test]
    async fn test_non_utf8_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(Config::new(dir.path())).await.unwrap();

        cache.set("bin", &[0xff, 0xfe], &EntryOptions::new()).await;
        assert!(cache.get_string("bin").await.is_none());
        assert!(cache.get("bin").await.is_some());
    }
}
