use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use collector_core::SchedulerControl;

use crate::handlers::{
    health::health_check,
    jobs::{get_status, pause_scheduler, resume_scheduler, trigger_job},
    metrics::render_metrics,
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<dyn SchedulerControl>,
    pub metrics: Option<PrometheusHandle>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        // 调度控制
        .route("/status", get(get_status))
        .route("/trigger", post(trigger_job))
        .route("/pause", post(pause_scheduler))
        .route("/resume", post(resume_scheduler))
        .with_state(state)
}
