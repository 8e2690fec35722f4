//! Cache configuration for the key-value state store

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::validation::{ConfigValidator, ValidationUtils};

/// Redis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Use Redis when true, otherwise an in-process store
    pub enabled: bool,
    /// Redis connection URL
    pub redis_url: String,
    /// Optional key prefix for this instance
    pub key_prefix: Option<String>,
    /// Default TTL for every written key, 0 disables expiry
    pub default_ttl_seconds: u64,
    /// Connection timeout in seconds
    pub connection_timeout_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: None,
            default_ttl_seconds: 600,
            connection_timeout_seconds: 5,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Option<Duration> {
        if self.default_ttl_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.default_ttl_seconds))
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }
}

impl ConfigValidator for CacheConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.enabled {
            ValidationUtils::validate_url(&self.redis_url, "cache.redis_url", &["redis", "rediss"])?;
            ValidationUtils::validate_timeout_seconds(
                self.connection_timeout_seconds,
                "cache.connection_timeout_seconds",
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.default_ttl(), Some(Duration::from_secs(600)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = CacheConfig {
            default_ttl_seconds: 0,
            ..Default::default()
        };
        assert_eq!(config.default_ttl(), None);
    }

    #[test]
    fn test_invalid_redis_url() {
        let config = CacheConfig {
            redis_url: "http://localhost:6379".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let disabled = CacheConfig {
            enabled: false,
            redis_url: String::new(),
            ..Default::default()
        };
        assert!(disabled.validate().is_ok());
    }
}
