use collector_config::RetryConfig;
use collector_errors::CollectorError;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// 重试耗尽后的结果，保留最后一次错误和实际尝试次数
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: CollectorError,
}

impl fmt::Display for RetryExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 次尝试后仍失败: {}", self.attempts, self.last_error)
    }
}

impl From<RetryExhausted> for CollectorError {
    fn from(err: RetryExhausted) -> Self {
        err.last_error
    }
}

/// 指数退避重试策略
///
/// 第 n 次重试前等待 `base_delay * multiplier^(n-1)`，上限为 `max_delay`，
/// 再叠加 `±jitter_factor` 比例的随机抖动。只有判定为可重试的错误才会重试。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_multiplier: f64,
    jitter_factor: f64,
    max_delay: Duration,
    retryable: fn(&CollectorError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
            max_delay: base_delay.max(Duration::from_secs(60)),
            retryable: CollectorError::is_retryable,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            jitter_factor: config.jitter_factor,
            max_delay: Duration::from_millis(config.max_delay_ms),
            retryable: CollectorError::is_retryable,
        }
    }

    /// 只尝试一次
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_backoff(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// 替换可重试错误的判定
    pub fn retry_if(mut self, predicate: fn(&CollectorError) -> bool) -> Self {
        self.retryable = predicate;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 第 `retry` 次重试（从 1 开始）前的等待时间
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let exponential = base * self.backoff_multiplier.powi(retry.saturating_sub(1) as i32);
        let capped = exponential.min(self.max_delay.as_secs_f64());

        let jitter = capped * self.jitter_factor * (rand::random::<f64>() - 0.5) * 2.0;
        Duration::from_secs_f64((capped + jitter).max(0.0))
    }

    /// 执行操作，失败时按策略重试
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollectorError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} 在第 {} 次尝试时成功", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_attempts && (self.retryable)(&err) => {
                    let delay = self.delay_for_retry(attempt);
                    warn!(
                        "{} 第 {} 次尝试失败: {}，{:?} 后重试",
                        operation, attempt, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }
            }
        }
    }
}
