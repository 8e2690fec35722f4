//! # Collector API
//!
//! 采集服务的 HTTP 控制面，基于 Axum 构建。
//!
//! ## API 端点
//!
//! - `GET /status` - 所有任务的状态
//! - `POST /trigger?job=<name>` - 异步触发任务
//! - `POST /pause` - 暂停调度
//! - `POST /resume` - 恢复调度
//! - `GET /health` - 健康检查
//! - `GET /metrics` - Prometheus 指标
//!
//! 错误统一返回 `{"error": "<message>"}`。控制面本身不做认证。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;

use collector_config::ApiConfig;
use collector_core::SchedulerControl;
use middleware::{cors_layer, panic_response, request_logging, trace_layer};
pub use routes::{create_routes, AppState};

/// 创建完整的API应用
pub fn create_app(
    scheduler: Arc<dyn SchedulerControl>,
    metrics: Option<PrometheusHandle>,
    api_config: &ApiConfig,
) -> Router {
    let state = AppState { scheduler, metrics };

    let router = create_routes(state).layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(trace_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if api_config.cors_enabled {
        router.layer(cors_layer())
    } else {
        router
    }
}
