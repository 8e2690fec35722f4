use async_trait::async_trait;
use collector_errors::CollectorResult;

use crate::models::Dataset;

/// 下游转换服务的上传通道
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// 发送一批记录（JSON 数组）
    ///
    /// 可重试的失败返回 `Network`，其余失败不会被重试。
    async fn send(&self, dataset: Dataset, payload: &serde_json::Value) -> CollectorResult<()>;
}
