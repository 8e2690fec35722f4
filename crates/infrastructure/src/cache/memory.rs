use async_trait::async_trait;
use collector_core::{CacheService, CollectorResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// 进程内缓存
///
/// Redis 未启用时使用，过期的键在读取时惰性清除。
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    default_ttl: Option<Duration>,
}

impl InMemoryCache {
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// 当前未过期的键数量
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        debug!("缓存键已过期: {}", key);
        self.entries.write().await.remove(key);
        None
    }
}

#[async_trait]
impl CacheService for InMemoryCache {
    async fn get(&self, key: &str) -> CollectorResult<Option<String>> {
        Ok(self.live_value(key).await)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CollectorResult<()> {
        let expires_at = ttl.or(self.default_ttl).map(|ttl| Instant::now() + ttl);
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> CollectorResult<bool> {
        Ok(self.live_value(key).await.is_some())
    }

    async fn delete(&self, key: &str) -> CollectorResult<bool> {
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|e| e.is_live(Instant::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = InMemoryCache::new(None);
        assert_eq!(cache.get("patients_hash").await.unwrap(), None);

        cache.set("patients_hash", "abc", None).await.unwrap();
        assert_eq!(
            cache.get("patients_hash").await.unwrap().as_deref(),
            Some("abc")
        );
        assert!(cache.exists("patients_hash").await.unwrap());

        assert!(cache.delete("patients_hash").await.unwrap());
        assert!(!cache.delete("patients_hash").await.unwrap());
        assert!(!cache.exists("patients_hash").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_is_last_write_wins() {
        let cache = InMemoryCache::new(None);
        cache.set("k", "first", None).await.unwrap();
        cache.set("k", "second", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("second"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = InMemoryCache::new(Some(Duration::from_millis(20)));
        cache.set("short", "v", None).await.unwrap();
        cache
            .set("long", "v", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert!(cache.exists("long").await.unwrap());
        assert_eq!(cache.len().await, 1);
    }
}
