//! 数据同步任务
//!
//! 每次同步打开全新的诊所会话完成采集，会话关闭后再交给上传器。
//! 取消令牌被触发时采集立即中断，会话照常关闭，不会上传任何数据。

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use collector_config::{ClinicConfig, JobsConfig};
use collector_core::{
    BrowserLauncher, CacheService, CollectorResult, Dataset, SYNC_NEVER,
};
use collector_dispatcher::JobScheduler;

use crate::clinic::ClinicClient;
use crate::uploader::{UploadOutcome, Uploader};

pub struct SyncTasks {
    launcher: Arc<dyn BrowserLauncher>,
    clinic: ClinicConfig,
    uploader: Uploader,
    cache: Arc<dyn CacheService>,
    cancel: CancellationToken,
}

impl SyncTasks {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        clinic: ClinicConfig,
        uploader: Uploader,
        cache: Arc<dyn CacheService>,
    ) -> Self {
        Self {
            launcher,
            clinic,
            uploader,
            cache,
            cancel: CancellationToken::new(),
        }
    }

    /// 使用调度器的取消令牌，停止调度时中断正在进行的采集
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 采集并上传一个数据集
    ///
    /// 没有采集到任何记录时返回 `Ok(None)`，缓存保持不变。
    pub async fn sync(&self, dataset: Dataset) -> CollectorResult<Option<UploadOutcome>> {
        match dataset {
            Dataset::Patients => self.sync_patients().await,
            Dataset::Appointments => self.sync_appointments().await,
        }
    }

    pub async fn sync_patients(&self) -> CollectorResult<Option<UploadOutcome>> {
        info!("开始任务: 同步患者");
        let patients =
            ClinicClient::scoped(self.launcher.clone(), &self.clinic, &self.cancel, |client| {
                Box::pin(client.list_patients())
            })
            .await?;
        self.finish(Dataset::Patients, &patients).await
    }

    pub async fn sync_appointments(&self) -> CollectorResult<Option<UploadOutcome>> {
        info!("开始任务: 同步预约");
        let appointments =
            ClinicClient::scoped(self.launcher.clone(), &self.clinic, &self.cancel, |client| {
                Box::pin(client.list_appointments_on(None))
            })
            .await?;
        self.finish(Dataset::Appointments, &appointments).await
    }

    async fn finish<T: Serialize + Sync>(
        &self,
        dataset: Dataset,
        records: &[T],
    ) -> CollectorResult<Option<UploadOutcome>> {
        if records.is_empty() {
            warn!("没有采集到 {} 数据", dataset);
            return Ok(None);
        }

        let outcome = self.uploader.upload(dataset, records).await?;

        self.cache
            .set(&dataset.sync_key(), &Utc::now().to_rfc3339(), None)
            .await?;
        info!(
            "{} 同步完成: {} 条记录，结果 {}",
            dataset,
            records.len(),
            outcome.as_str()
        );
        Ok(Some(outcome))
    }
}

/// 把启用的数据集注册为调度任务，返回注册的任务名
pub fn register_jobs(
    scheduler: &JobScheduler,
    tasks: Arc<SyncTasks>,
    jobs: &JobsConfig,
) -> CollectorResult<Vec<String>> {
    let mut registered = Vec::new();

    for (dataset, job) in [
        (Dataset::Patients, &jobs.patients),
        (Dataset::Appointments, &jobs.appointments),
    ] {
        if !job.enabled {
            info!("任务 {} 未启用", dataset);
            continue;
        }

        let tasks = tasks.clone();
        scheduler.add_job(dataset.name(), job.interval(), move || {
            let tasks = tasks.clone();
            async move { tasks.sync(dataset).await.map(|_| ()) }
        })?;
        registered.push(dataset.name().to_string());
    }

    Ok(registered)
}

/// 为从未同步过的数据集写入占位时间戳
pub async fn seed_sync_markers(cache: &dyn CacheService) -> CollectorResult<()> {
    for dataset in Dataset::ALL {
        let key = dataset.sync_key();
        if !cache.exists(&key).await? {
            cache.set(&key, SYNC_NEVER, None).await?;
        }
    }
    info!("同步时间戳已初始化");
    Ok(())
}
