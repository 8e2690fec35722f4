use async_trait::async_trait;
use collector_config::UploaderConfig;
use collector_core::{CollectorError, CollectorResult, Dataset, UploadTransport};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, instrument};

/// 通过 HTTP 把记录推送给下游转换服务
///
/// 每个数据集对应 `POST <base_url>/<dataset>`，请求体为 JSON 数组。
pub struct HttpUploadTransport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    dry_run: bool,
}

impl HttpUploadTransport {
    pub fn new(config: &UploaderConfig) -> CollectorResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CollectorError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            dry_run: config.dry_run,
        })
    }

    pub fn endpoint(&self, dataset: Dataset) -> String {
        format!("{}/{}", self.base_url, dataset.name())
    }
}

/// 5xx 与 429 视为暂时性故障
fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    #[instrument(skip(self, payload), fields(dataset = %dataset))]
    async fn send(&self, dataset: Dataset, payload: &Value) -> CollectorResult<()> {
        let records = payload.as_array().map_or(0, Vec::len);

        if self.dry_run {
            info!("dry-run 模式，跳过上传 {} 条 {} 记录", records, dataset);
            return Ok(());
        }

        let url = self.endpoint(dataset);
        debug!("上传 {} 条记录到 {}", records, url);

        let mut request = self.client.post(&url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CollectorError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("HTTP {}: {}", status.as_u16(), body.trim());
        if is_transient(status) {
            Err(CollectorError::Network(message))
        } else {
            Err(CollectorError::Upload {
                dataset: dataset.name().to_string(),
                attempts: 1,
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn spawn_server(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();

        let app = Router::new().route(
            "/appointments",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    sink.lock().unwrap().push((auth, body));
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), captured)
    }

    fn config(base_url: &str) -> UploaderConfig {
        UploaderConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_posts_payload_with_bearer() {
        let (base_url, captured) = spawn_server(StatusCode::OK).await;
        let mut config = config(&base_url);
        config.api_key = Some("secret".to_string());

        let transport = HttpUploadTransport::new(&config).unwrap();
        let payload = json!([{ "patient_name": "Anna" }]);
        transport.send(Dataset::Appointments, &payload).await.unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].0.as_deref(), Some("Bearer secret"));
        assert_eq!(captured[0].1, payload);
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let (base_url, _) = spawn_server(StatusCode::SERVICE_UNAVAILABLE).await;
        let transport = HttpUploadTransport::new(&config(&base_url)).unwrap();

        let err = transport
            .send(Dataset::Appointments, &json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Network(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_client_error_is_permanent() {
        let (base_url, _) = spawn_server(StatusCode::UNPROCESSABLE_ENTITY).await;
        let transport = HttpUploadTransport::new(&config(&base_url)).unwrap();

        let err = transport
            .send(Dataset::Appointments, &json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Upload { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_post() {
        let (base_url, captured) = spawn_server(StatusCode::OK).await;
        let mut config = config(&base_url);
        config.dry_run = true;

        let transport = HttpUploadTransport::new(&config).unwrap();
        transport
            .send(Dataset::Appointments, &json!([{ "a": 1 }]))
            .await
            .unwrap();
        assert!(captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let transport = HttpUploadTransport::new(&config("http://127.0.0.1:1")).unwrap();
        let err = transport
            .send(Dataset::Patients, &json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Network(_)));
    }

    #[test]
    fn test_endpoint() {
        let transport = HttpUploadTransport::new(&config("http://api:8000/")).unwrap();
        assert_eq!(transport.endpoint(Dataset::Patients), "http://api:8000/patients");
    }
}
