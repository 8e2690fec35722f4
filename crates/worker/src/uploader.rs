//! 变更检测与上传
//!
//! 每个数据集在缓存中保存最近一次成功上传内容的摘要。内容不变时跳过上传；
//! 上传失败时摘要保持不变，下次运行会重新尝试。

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use collector_core::{
    content_digest, CacheService, CollectorError, CollectorResult, Dataset, RetryPolicy,
    UploadTransport,
};
use collector_infrastructure::MetricsCollector;

/// 一次上传请求的结果；失败通过 `Err` 返回
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    Skipped,
}

impl UploadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadOutcome::Uploaded => "uploaded",
            UploadOutcome::Skipped => "skipped",
        }
    }
}

pub struct Uploader {
    cache: Arc<dyn CacheService>,
    transport: Arc<dyn UploadTransport>,
    retry: RetryPolicy,
    metrics: MetricsCollector,
}

impl Uploader {
    pub fn new(
        cache: Arc<dyn CacheService>,
        transport: Arc<dyn UploadTransport>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            cache,
            transport,
            retry,
            metrics: MetricsCollector::new(),
        }
    }

    /// 批次内容与缓存中的摘要不同（或没有摘要）时返回 true
    pub async fn should_upload<T: Serialize + Sync>(
        &self,
        dataset: Dataset,
        batch: &[T],
    ) -> CollectorResult<bool> {
        let digest = content_digest(batch)?;
        self.differs_from_cached(dataset, &digest).await
    }

    async fn differs_from_cached(&self, dataset: Dataset, digest: &str) -> CollectorResult<bool> {
        match self.cache.get(&dataset.hash_key()).await? {
            None => {
                info!("{} 没有历史摘要，需要上传", dataset);
                Ok(true)
            }
            Some(previous) if previous != digest => {
                info!("{} 内容有变化，需要上传", dataset);
                Ok(true)
            }
            Some(_) => {
                info!("{} 内容没有变化，跳过上传", dataset);
                Ok(false)
            }
        }
    }

    /// 内容有变化时上传并更新摘要
    pub async fn upload<T: Serialize + Sync>(
        &self,
        dataset: Dataset,
        batch: &[T],
    ) -> CollectorResult<UploadOutcome> {
        let payload = serde_json::to_value(batch)?;
        let digest = content_digest(&payload)?;

        if !self.differs_from_cached(dataset, &digest).await? {
            self.metrics.record_upload(dataset.name(), "skipped");
            return Ok(UploadOutcome::Skipped);
        }

        let operation = format!("上传 {dataset}");
        let sent = self
            .retry
            .execute(&operation, || self.transport.send(dataset, &payload))
            .await;

        if let Err(exhausted) = sent {
            self.metrics.record_upload(dataset.name(), "failed");
            warn!(
                "{} 上传失败（尝试 {} 次）: {}",
                dataset, exhausted.attempts, exhausted.last_error
            );
            let message = match exhausted.last_error {
                CollectorError::Upload { message, .. } => message,
                other => other.to_string(),
            };
            return Err(CollectorError::Upload {
                dataset: dataset.name().to_string(),
                attempts: exhausted.attempts,
                message,
            });
        }

        self.cache
            .set(&dataset.hash_key(), &digest, None)
            .await?;
        self.metrics.record_upload(dataset.name(), "uploaded");
        info!("{} 已上传 {} 条记录并更新摘要", dataset, batch.len());
        Ok(UploadOutcome::Uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_config::RetryConfig;
    use collector_testing_utils::{fast_retry_config, AppointmentBuilder, MockCache, RecordingTransport};

    fn uploader(cache: &MockCache, transport: &RecordingTransport, retry: RetryConfig) -> Uploader {
        Uploader::new(
            Arc::new(cache.clone()),
            Arc::new(transport.clone()),
            RetryPolicy::from_config(&retry),
        )
    }

    #[tokio::test]
    async fn test_identical_batches_upload_then_skip() {
        let cache = MockCache::new();
        let transport = RecordingTransport::new();
        let uploader = uploader(&cache, &transport, fast_retry_config(3));
        let batch = vec![AppointmentBuilder::new().with_date("2024-01-01").build()];

        let first = uploader.upload(Dataset::Appointments, &batch).await.unwrap();
        let second = uploader.upload(Dataset::Appointments, &batch).await.unwrap();

        assert_eq!(first, UploadOutcome::Uploaded);
        assert_eq!(second, UploadOutcome::Skipped);
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(
            cache.value("appointments_hash"),
            Some(content_digest(&batch).unwrap())
        );
    }

    #[tokio::test]
    async fn test_changed_batch_is_uploaded_again() {
        let cache = MockCache::new();
        let transport = RecordingTransport::new();
        let uploader = uploader(&cache, &transport, fast_retry_config(3));

        let booked = vec![AppointmentBuilder::new().with_status("Booked").build()];
        let cancelled = vec![AppointmentBuilder::new().with_status("Cancelled").build()];

        uploader.upload(Dataset::Appointments, &booked).await.unwrap();
        let outcome = uploader.upload(Dataset::Appointments, &cancelled).await.unwrap();

        assert_eq!(outcome, UploadOutcome::Uploaded);
        assert_eq!(transport.sent().len(), 2);
        assert_eq!(transport.sent()[1].1[0]["status"], "Cancelled");
    }

    #[tokio::test]
    async fn test_should_upload_compares_with_cached_digest() {
        let batch = vec![AppointmentBuilder::new().build()];
        let digest = content_digest(&batch).unwrap();
        let transport = RecordingTransport::new();

        let fresh = uploader(&MockCache::new(), &transport, fast_retry_config(1));
        assert!(fresh.should_upload(Dataset::Appointments, &batch).await.unwrap());

        let cached = MockCache::new().with_value("appointments_hash", &digest);
        let known = uploader(&cached, &transport, fast_retry_config(1));
        assert!(!known.should_upload(Dataset::Appointments, &batch).await.unwrap());

        // 不同数据集使用各自的摘要
        assert!(known.should_upload(Dataset::Patients, &batch).await.unwrap());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let cache = MockCache::new();
        let transport = RecordingTransport::new();
        transport.fail_next(CollectorError::Network("503".into()));
        let uploader = uploader(&cache, &transport, fast_retry_config(3));
        let batch = vec![AppointmentBuilder::new().build()];

        let outcome = uploader.upload(Dataset::Appointments, &batch).await.unwrap();

        assert_eq!(outcome, UploadOutcome::Uploaded);
        assert_eq!(transport.attempts(), 2);
        assert!(cache.value("appointments_hash").is_some());
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_digest_untouched() {
        let cache = MockCache::new().with_value("appointments_hash", "old");
        let transport = RecordingTransport::new();
        for _ in 0..3 {
            transport.fail_next(CollectorError::Network("connection reset".into()));
        }
        let uploader = uploader(&cache, &transport, fast_retry_config(3));
        let batch = vec![AppointmentBuilder::new().build()];

        let err = uploader
            .upload(Dataset::Appointments, &batch)
            .await
            .unwrap_err();

        match err {
            CollectorError::Upload { dataset, attempts, .. } => {
                assert_eq!(dataset, "appointments");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(cache.value("appointments_hash").as_deref(), Some("old"));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let cache = MockCache::new();
        let transport = RecordingTransport::new();
        transport.fail_next(CollectorError::Upload {
            dataset: "appointments".into(),
            attempts: 1,
            message: "HTTP 422: invalid".into(),
        });
        let uploader = uploader(&cache, &transport, fast_retry_config(3));

        let err = uploader
            .upload(Dataset::Appointments, &[AppointmentBuilder::new().build()])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("HTTP 422: invalid"));
        assert_eq!(transport.attempts(), 1);
        assert!(cache.value("appointments_hash").is_none());
    }

    #[tokio::test]
    async fn test_cache_outage_propagates() {
        let cache = MockCache::new();
        cache.set_unavailable(true);
        let transport = RecordingTransport::new();
        let uploader = uploader(&cache, &transport, fast_retry_config(1));

        let err = uploader
            .upload(Dataset::Patients, &[AppointmentBuilder::new().build()])
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::Cache(_)));
        assert_eq!(transport.attempts(), 0);
    }
}
