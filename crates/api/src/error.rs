use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use collector_errors::CollectorError;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Collector(#[from] CollectorError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Collector(CollectorError::UnknownJob { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Collector(CollectorError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) | ApiError::Collector(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Collector(CollectorError::UnknownJob { .. }) => "Unknown job".to_string(),
            ApiError::Collector(CollectorError::Cancelled) => {
                "Scheduler is shutting down".to_string()
            }
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!("请求处理失败: {}", message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(CollectorError::unknown_job("foo")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::BadRequest("Missing job parameter".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CollectorError::Cancelled).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(CollectorError::Cache("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_unknown_job_message() {
        let response = ApiError::from(CollectorError::unknown_job("invoices")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Unknown job");
    }
}
