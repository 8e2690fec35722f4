use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct TriggerParams {
    pub job: Option<String>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<Value> {
    let jobs = state.scheduler.job_status().await;
    Json(json!({
        "time": Utc::now().to_rfc3339(),
        "jobs": jobs,
    }))
}

/// 异步触发任务，不等待任务完成
pub async fn trigger_job(
    State(state): State<AppState>,
    Query(params): Query<TriggerParams>,
) -> ApiResult<impl IntoResponse> {
    let job = params
        .job
        .filter(|job| !job.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing job parameter".to_string()))?;

    info!("收到手动触发请求: {}", job);
    state.scheduler.trigger_in_background(&job)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "triggered": job,
            "time": Utc::now().to_rfc3339(),
        })),
    ))
}

pub async fn pause_scheduler(State(state): State<AppState>) -> Json<Value> {
    state.scheduler.pause().await;
    info!("调度器已被手动暂停");
    Json(json!({ "status": "paused" }))
}

pub async fn resume_scheduler(State(state): State<AppState>) -> Json<Value> {
    if state.scheduler.resume().await {
        info!("调度器已被手动恢复");
        Json(json!({ "status": "resumed" }))
    } else {
        Json(json!({ "status": "already running" }))
    }
}
