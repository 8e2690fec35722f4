use std::sync::Arc;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::{net::TcpListener, sync::broadcast, task::JoinHandle};
use tracing::{error, info, warn};

use collector_api::create_app;
use collector_config::AppConfig;
use collector_core::{BrowserLauncher, CacheService, Dataset, RetryPolicy, UploadTransport};
use collector_dispatcher::JobScheduler;
use collector_infrastructure::{create_cache, HttpUploadTransport, WebDriverLauncher};
use collector_worker::{register_jobs, seed_sync_markers, SyncTasks, UploadOutcome, Uploader};

/// 主应用程序
pub struct Application {
    config: AppConfig,
    scheduler: JobScheduler,
    tasks: Arc<SyncTasks>,
    metrics_handle: Option<PrometheusHandle>,
}

impl Application {
    /// 按配置连接缓存、WebDriver 和上传接口
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!(
            "初始化缓存: {}",
            if config.cache.enabled {
                mask_url(&config.cache.redis_url)
            } else {
                "内存缓存".to_string()
            }
        );
        let cache = create_cache(&config.cache)
            .await
            .context("初始化缓存失败")?;

        info!("WebDriver 地址: {}", config.clinic.webdriver_url);
        let launcher = Arc::new(
            WebDriverLauncher::new(&config.clinic).context("创建WebDriver启动器失败")?,
        );

        info!(
            "上传地址: {}，API Key {}",
            config.uploader.base_url,
            if config.uploader.api_key.is_some() {
                "已配置"
            } else {
                "未配置"
            }
        );
        let transport = Arc::new(
            HttpUploadTransport::new(&config.uploader).context("创建上传客户端失败")?,
        );

        let metrics_handle = if config.observability.metrics_enabled {
            Some(
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("安装Prometheus指标记录器失败")?,
            )
        } else {
            None
        };

        let mut app = Self::with_components(config, launcher, transport, cache).await?;
        app.metrics_handle = metrics_handle;
        Ok(app)
    }

    /// 使用给定的组件组装应用
    pub async fn with_components(
        config: AppConfig,
        launcher: Arc<dyn BrowserLauncher>,
        transport: Arc<dyn UploadTransport>,
        cache: Arc<dyn CacheService>,
    ) -> Result<Self> {
        if !config.clinic.has_credentials() {
            warn!("未配置诊所账号，登录将会失败");
        }

        seed_sync_markers(cache.as_ref())
            .await
            .context("初始化同步时间戳失败")?;

        let uploader = Uploader::new(
            cache.clone(),
            transport,
            RetryPolicy::from_config(&config.uploader.retry),
        );
        let scheduler = JobScheduler::from_config(&config.scheduler);
        // 停止调度时中断正在进行的采集，会话仍会被关闭
        let tasks = Arc::new(
            SyncTasks::new(launcher, config.clinic.clone(), uploader, cache)
                .with_cancellation(scheduler.cancellation_token()),
        );

        let registered = register_jobs(&scheduler, tasks.clone(), &config.scheduler.jobs)
            .context("注册调度任务失败")?;
        if registered.is_empty() {
            warn!("没有启用任何任务，调度器将空转");
        }

        Ok(Self {
            config,
            scheduler,
            tasks,
            metrics_handle: None,
        })
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    /// 只执行一次同步，不启动调度器
    pub async fn run_once(&self, dataset: Dataset) -> Result<Option<UploadOutcome>> {
        info!("单次同步: {}", dataset);
        self.tasks
            .sync(dataset)
            .await
            .with_context(|| format!("{dataset} 同步失败"))
    }

    /// 运行调度器和控制面，直到收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let listener = if self.config.api.enabled {
            let listener = TcpListener::bind(&self.config.api.bind_address)
                .await
                .with_context(|| format!("绑定地址失败: {}", self.config.api.bind_address))?;
            Some(listener)
        } else {
            info!("控制面未启用");
            None
        };

        self.run_with_listener(listener, shutdown_rx).await
    }

    pub async fn run_with_listener(
        &self,
        listener: Option<TcpListener>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        self.scheduler.start().await;
        info!("调度器已启动，任务: {:?}", self.scheduler.job_names());

        let server = match listener {
            Some(listener) => Some(self.spawn_api(listener, shutdown_rx.resubscribe())?),
            None => None,
        };

        let _ = shutdown_rx.recv().await;
        info!("应用收到关闭信号");

        self.scheduler.stop().await;

        if let Some(handle) = server {
            match handle.await {
                Ok(Ok(())) => info!("控制面已停止"),
                Ok(Err(e)) => error!("控制面运行失败: {}", e),
                Err(e) => error!("控制面任务异常退出: {}", e),
            }
        }

        Ok(())
    }

    fn spawn_api(
        &self,
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<std::io::Result<()>>> {
        let addr = listener.local_addr().context("读取监听地址失败")?;
        let app = create_app(
            Arc::new(self.scheduler.clone()),
            self.metrics_handle.clone(),
            &self.config.api,
        );

        info!("控制面启动在 http://{}", addr);
        Ok(tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
        }))
    }
}

/// 屏蔽URL中的密码
pub fn mask_url(url: &str) -> String {
    let start = url.find("://").map_or(0, |i| i + 3);
    if let Some(at_pos) = url[start..].find('@').map(|i| i + start) {
        if let Some(colon_pos) = url[start..at_pos].rfind(':').map(|i| i + start) {
            let mut masked = url.to_string();
            masked.replace_range(colon_pos + 1..at_pos, "***");
            return masked;
        }
    }
    url.to_string()
}
