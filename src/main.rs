use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use collector_config::{AppConfig, LogFormat};
use collector_core::Dataset;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use collector::app::Application;
use collector::shutdown::{wait_for_shutdown_signal, ShutdownManager};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("collector")
        .version(env!("CARGO_PKG_VERSION"))
        .about("诊所系统数据采集服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，缺省时按默认路径查找"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .value_name("DATASET")
                .help("只同步一次指定数据集后退出")
                .value_parser(["patients", "appointments"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let config = AppConfig::load(config_path.map(String::as_str)).with_context(|| {
        format!(
            "加载配置失败: {}",
            config_path.map(String::as_str).unwrap_or("默认路径")
        )
    })?;

    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| config.observability.log_level.clone());
    let log_format = match matches.get_one::<String>("log-format") {
        Some(format) => format.parse().map_err(anyhow::Error::msg)?,
        None => config.observability.log_format,
    };

    let _log_guard = init_logging(
        &log_level,
        log_format,
        config.observability.log_dir.as_deref(),
    )?;

    info!("启动诊所数据采集服务 v{}", env!("CARGO_PKG_VERSION"));

    let app = Application::new(config).await?;

    if let Some(dataset) = matches.get_one::<String>("once") {
        let dataset: Dataset = dataset.parse().map_err(anyhow::Error::msg)?;
        return match app.run_once(dataset).await? {
            Some(outcome) => {
                info!("{} 单次同步完成: {}", dataset, outcome.as_str());
                Ok(())
            }
            None => {
                warn!("{} 没有可同步的数据", dataset);
                Ok(())
            }
        };
    }

    let shutdown_manager = ShutdownManager::new();

    let app_handle = {
        let app = Arc::new(app);
        let shutdown_rx = shutdown_manager.subscribe().await;

        tokio::spawn(async move {
            if let Err(e) = app.run(shutdown_rx).await {
                error!("应用运行失败: {e:#}");
            }
        })
    };

    wait_for_shutdown_signal().await;
    info!("收到关闭信号，开始优雅关闭...");

    shutdown_manager.shutdown().await;

    match tokio::time::timeout(Duration::from_secs(30), app_handle).await {
        Ok(Ok(())) => info!("应用已优雅关闭"),
        Ok(Err(e)) => error!("应用关闭时发生错误: {e}"),
        Err(_) => warn!("应用关闭超时，强制退出"),
    }

    info!("诊所数据采集服务已退出");
    Ok(())
}

/// 初始化日志系统，返回的 guard 需要保持到进程结束
fn init_logging(
    log_level: &str,
    log_format: LogFormat,
    log_dir: Option<&str>,
) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let (file_writer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "collector.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        LogFormat::Json => {
            registry
                .with(fmt::layer().json())
                .with(file_writer.map(|w| fmt::layer().json().with_writer(w)))
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        LogFormat::Pretty => {
            registry
                .with(fmt::layer().pretty())
                .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
    }

    Ok(guard)
}
