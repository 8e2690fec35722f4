//! Redis cache manager implementation

use super::CacheStats;
use async_trait::async_trait;
use collector_config::CacheConfig;
use collector_core::{CacheService, CollectorError, CollectorResult};
use redis::aio::ConnectionManager;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

fn cache_error(e: redis::RedisError) -> CollectorError {
    CollectorError::Cache(e.to_string())
}

/// Redis cache manager
pub struct RedisCacheManager {
    /// Multiplexed connection, reconnects on its own
    connection: ConnectionManager,
    /// Expiry used when callers pass no TTL
    default_ttl: Option<Duration>,
    /// Cache statistics
    stats: RwLock<CacheStats>,
    /// Key prefix for this instance
    key_prefix: String,
}

impl RedisCacheManager {
    /// Connect to Redis and verify the connection with PING
    pub async fn new(config: CacheConfig) -> CollectorResult<Self> {
        if !config.enabled {
            return Err(CollectorError::Configuration(
                "Cache is disabled".to_string(),
            ));
        }

        info!("Creating Redis cache manager with URL: {}", config.redis_url);

        let client = redis::Client::open(config.redis_url.clone()).map_err(cache_error)?;

        let mut connection = tokio::time::timeout(
            config.connection_timeout(),
            client.get_connection_manager(),
        )
        .await
        .map_err(|_| {
            CollectorError::Cache(format!("Timed out connecting to {}", config.redis_url))
        })?
        .map_err(cache_error)?;

        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(cache_error)?;

        info!("Redis cache manager created successfully");

        Ok(Self {
            connection,
            default_ttl: config.default_ttl(),
            stats: RwLock::new(CacheStats::default()),
            key_prefix: config.key_prefix.clone().unwrap_or_default(),
        })
    }

    /// Build full cache key with prefix
    fn build_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    async fn record<F: FnOnce(&mut CacheStats)>(&self, update: F) {
        let mut stats = self.stats.write().await;
        update(&mut stats);
    }

    async fn fail(&self, operation: &str, key: &str, e: redis::RedisError) -> CollectorError {
        error!("Cache {} failed for key {}: {}", operation, key, e);
        self.record(|s| s.errors += 1).await;
        cache_error(e)
    }
}

#[async_trait]
impl CacheService for RedisCacheManager {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> CollectorResult<Option<String>> {
        let full_key = self.build_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = match redis::cmd("GET")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
        {
            Ok(value) => value,
            Err(e) => return Err(self.fail("GET", &full_key, e).await),
        };

        if result.is_some() {
            debug!("Cache HIT: {}", full_key);
            self.record(|s| s.hits += 1).await;
        } else {
            debug!("Cache MISS: {}", full_key);
            self.record(|s| s.misses += 1).await;
        }
        Ok(result)
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CollectorResult<()> {
        let full_key = self.build_key(key);
        let mut conn = self.connection.clone();

        let cmd = match ttl.or(self.default_ttl) {
            Some(ttl) => {
                let mut cmd = redis::cmd("SETEX");
                cmd.arg(&full_key).arg(ttl.as_secs().max(1)).arg(value);
                cmd
            }
            None => {
                let mut cmd = redis::cmd("SET");
                cmd.arg(&full_key).arg(value);
                cmd
            }
        };

        if let Err(e) = cmd.query_async::<()>(&mut conn).await {
            return Err(self.fail("SET", &full_key, e).await);
        }

        debug!("Cache SET success: {}", full_key);
        self.record(|s| s.sets += 1).await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn exists(&self, key: &str) -> CollectorResult<bool> {
        let full_key = self.build_key(key);
        let mut conn = self.connection.clone();

        match redis::cmd("EXISTS")
            .arg(&full_key)
            .query_async::<i64>(&mut conn)
            .await
        {
            Ok(count) => Ok(count > 0),
            Err(e) => Err(self.fail("EXISTS", &full_key, e).await),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> CollectorResult<bool> {
        let full_key = self.build_key(key);
        let mut conn = self.connection.clone();

        match redis::cmd("DEL")
            .arg(&full_key)
            .query_async::<i64>(&mut conn)
            .await
        {
            Ok(count) => {
                self.record(|s| s.deletes += 1).await;
                Ok(count > 0)
            }
            Err(e) => Err(self.fail("DEL", &full_key, e).await),
        }
    }
}
