//! Keyed caches with a fixed time-to-live.
//!
//! Stale entries are never purged proactively; a read simply treats them as
//! missing and the next `put` for the key supersedes them.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[async_trait]
pub trait CacheStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Value for `key` if present and younger than the TTL.
    async fn get_fresh(&self, key: &str) -> Option<V>;

    async fn put(&self, key: &str, value: V);

    async fn invalidate(&self, key: &str);

    async fn clear(&self);
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// In-process TTL cache.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of stored entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl<V> CacheStore<V> for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get_fresh(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;

        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    async fn put(&self, key: &str, value: V) {
        self.entries.write().await.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl<V> CacheStore<V> for NoopCache
where
    V: Clone + Send + Sync + 'static,
{
    async fn get_fresh(&self, _key: &str) -> Option<V> {
        None
    }

    async fn put(&self, _key: &str, _value: V) {}

    async fn invalidate(&self, _key: &str) {}

    async fn clear(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(30 * 60);

    #[tokio::test(start_paused = true)]
    async fn fresh_until_ttl_elapses() {
        let cache = TtlCache::new(TTL);
        cache.put("1", "menu".to_string()).await;

        tokio::time::advance(Duration::from_secs(29 * 60)).await;
        assert_eq!(cache.get_fresh("1").await.as_deref(), Some("menu"));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.get_fresh("1").await, None);
        // stale entries stay until superseded
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn put_supersedes_stale_entry() {
        let cache = TtlCache::new(TTL);
        cache.put("1", 1u32).await;
        tokio::time::advance(TTL).await;
        cache.put("1", 2u32).await;
        assert_eq!(cache.get_fresh("1").await, Some(2));
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let cache = TtlCache::new(TTL);
        cache.put("1", 1u32).await;
        cache.put("2", 2u32).await;

        cache.invalidate("1").await;
        assert_eq!(cache.get_fresh("1").await, None);
        assert_eq!(cache.get_fresh("2").await, Some(2));

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn noop_cache_stores_nothing() {
        let cache = NoopCache;
        CacheStore::<u32>::put(&cache, "1", 1).await;
        assert_eq!(CacheStore::<u32>::get_fresh(&cache, "1").await, None);
    }
}
