use async_trait::async_trait;
use collector_errors::CollectorResult;
use std::collections::BTreeMap;

use crate::models::JobStatus;

/// 调度器的运维控制接口，供 HTTP 控制面使用
#[async_trait]
pub trait SchedulerControl: Send + Sync {
    /// 所有任务的状态
    async fn job_status(&self) -> BTreeMap<String, JobStatus>;

    /// 在后台执行一次任务，不等待其完成
    ///
    /// 任务未注册时返回 `UnknownJob`，调度器已停止时返回 `Cancelled`。
    /// 后台执行由调度器持有，停止时会等待其结束。
    fn trigger_in_background(&self, name: &str) -> CollectorResult<()>;

    /// 暂停调度循环
    async fn pause(&self);

    /// 恢复调度循环，已在运行时返回 false
    async fn resume(&self) -> bool;
}
