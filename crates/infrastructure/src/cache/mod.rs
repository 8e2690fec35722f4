//! Key-value cache backends for content digests and sync timestamps.

pub mod manager;
pub mod memory;

pub use manager::*;
pub use memory::*;

use collector_config::CacheConfig;
use collector_core::{CacheService, CollectorResult};
use std::sync::Arc;
use tracing::info;

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Create the configured cache backend.
///
/// Redis when enabled, otherwise a process-local in-memory cache.
pub async fn create_cache(config: &CacheConfig) -> CollectorResult<Arc<dyn CacheService>> {
    if config.enabled {
        let manager = RedisCacheManager::new(config.clone()).await?;
        Ok(Arc::new(manager))
    } else {
        info!("Redis cache disabled, using in-memory cache");
        Ok(Arc::new(InMemoryCache::new(config.default_ttl())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_create_disabled_cache_is_in_memory() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let cache = create_cache(&config).await.unwrap();
        cache.set("k", "v", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
