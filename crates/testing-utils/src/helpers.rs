//! Test helper utilities and common testing patterns

use collector_config::{ClinicConfig, RetryConfig};
use std::time::Duration;
use tokio::time::sleep;

/// Test environment setup utilities
pub struct TestEnv;

impl TestEnv {
    /// Wait for a condition to be true with timeout
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = std::time::Instant::now();

        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }

        false
    }
}

/// Clinic settings with every delay removed and waits that give up at once
pub fn fast_clinic_config() -> ClinicConfig {
    ClinicConfig {
        base_url: "https://clinic.test/app".to_string(),
        email: "demo@clinic.test".to_string(),
        password: "secret".to_string(),
        selector_timeout_seconds: 0,
        calendar_timeout_seconds: 0,
        modal_timeout_ms: 0,
        modal_close_timeout_ms: 0,
        step_delay_ms: 0,
        settle_delay_ms: 0,
        ..Default::default()
    }
}

/// Retry settings with millisecond delays
pub fn fast_retry_config(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        base_delay_ms: 1,
        backoff_multiplier: 2.0,
        jitter_factor: 0.0,
        max_delay_ms: 10,
    }
}
