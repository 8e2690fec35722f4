use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::validation::{ConfigValidator, ValidationUtils};

/// 下游转换服务上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_seconds: u64,
    /// 只记录日志，不真正发送
    pub dry_run: bool,
    pub retry: RetryConfig,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://transform-api:8000".to_string(),
            api_key: None,
            request_timeout_seconds: 30,
            dry_run: false,
            retry: RetryConfig::default(),
        }
    }
}

impl UploaderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// 重试策略配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// 最大尝试次数（包含第一次）
    pub max_attempts: u32,
    /// 基础重试间隔（毫秒）
    pub base_delay_ms: u64,
    /// 指数退避倍数
    pub backoff_multiplier: f64,
    /// 重试间隔的随机抖动范围（0.0-1.0）
    pub jitter_factor: f64,
    /// 最大重试间隔（毫秒）
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 5_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.3,
            max_delay_ms: 60_000,
        }
    }
}

impl ConfigValidator for RetryConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_positive(self.max_attempts as u64, "retry.max_attempts")?;
        if self.backoff_multiplier < 1.0 {
            return Err(crate::ConfigError::Validation(
                "retry.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }
        ValidationUtils::validate_fraction(self.jitter_factor, "retry.jitter_factor")?;
        if self.max_delay_ms < self.base_delay_ms {
            return Err(crate::ConfigError::Validation(
                "retry.max_delay_ms must not be less than retry.base_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}

impl ConfigValidator for UploaderConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_url(&self.base_url, "uploader.base_url", &["http", "https"])?;
        ValidationUtils::validate_timeout_seconds(
            self.request_timeout_seconds,
            "uploader.request_timeout_seconds",
        )?;
        self.retry.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploader_config_default() {
        let config = UploaderConfig::default();
        assert_eq!(config.base_url, "http://transform-api:8000");
        assert!(config.api_key.is_none());
        assert!(!config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retry_config_validation() {
        let config = RetryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RetryConfig {
            jitter_factor: 2.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RetryConfig {
            base_delay_ms: 10_000,
            max_delay_ms: 1_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
