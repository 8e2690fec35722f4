use async_trait::async_trait;
use collector_config::ClinicConfig;
use collector_core::{
    BrowserLauncher, BrowserSession, CollectorError, CollectorResult, ElementHandle, Key,
};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// W3C 规定的元素引用字段名
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// 单个 WebDriver 命令的超时时间
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

fn key_code(key: Key) -> &'static str {
    match key {
        Key::Escape => "\u{E00C}",
    }
}

/// 启动新会话时请求的浏览器能力
pub fn session_capabilities(browser: &str, headless: bool) -> Value {
    match browser {
        "firefox" => {
            let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "firefox",
                        "moz:firefoxOptions": { "args": args }
                    }
                }
            })
        }
        _ => {
            let mut args = vec!["--no-sandbox", "--disable-dev-shm-usage"];
            if headless {
                args.push("--headless=new");
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "chrome",
                        "goog:chromeOptions": { "args": args }
                    }
                }
            })
        }
    }
}

/// 从响应体中取出 value 字段，驱动返回的错误转换为 `Browser`
pub fn unwrap_response(body: Value) -> CollectorResult<Value> {
    let mut body = body;
    let value = body
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(CollectorError::browser(format!("{error}: {message}")));
    }
    Ok(value)
}

/// 解析元素查询结果
pub fn element_handles(value: &Value) -> CollectorResult<Vec<ElementHandle>> {
    let items = value
        .as_array()
        .ok_or_else(|| CollectorError::browser("元素查询结果不是数组"))?;

    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(ElementHandle::new)
                .ok_or_else(|| CollectorError::browser("元素引用缺少标识"))
        })
        .collect()
}

/// WebDriver 会话启动器
pub struct WebDriverLauncher {
    client: Client,
    webdriver_url: String,
    browser: String,
    headless: bool,
}

impl WebDriverLauncher {
    pub fn new(config: &ClinicConfig) -> CollectorResult<Self> {
        let client = Client::builder()
            .timeout(COMMAND_TIMEOUT)
            .build()
            .map_err(|e| CollectorError::browser(e.to_string()))?;

        Ok(Self {
            client,
            webdriver_url: config.webdriver_url.trim_end_matches('/').to_string(),
            browser: config.browser.clone(),
            headless: config.headless,
        })
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> CollectorResult<Box<dyn BrowserSession>> {
        info!("启动浏览器会话: {} ({})", self.browser, self.webdriver_url);

        let response = self
            .client
            .post(format!("{}/session", self.webdriver_url))
            .json(&session_capabilities(&self.browser, self.headless))
            .send()
            .await
            .map_err(|e| CollectorError::browser(format!("无法连接 WebDriver: {e}")))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| CollectorError::browser(e.to_string()))?;
        let value = unwrap_response(body)?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| CollectorError::browser("新会话响应缺少 sessionId"))?
            .to_string();

        debug!("浏览器会话已创建: {}", session_id);

        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", self.webdriver_url, session_id),
        }))
    }
}

/// 一个 WebDriver 会话
pub struct WebDriverSession {
    client: Client,
    session_url: String,
}

impl WebDriverSession {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> CollectorResult<Value> {
        let url = format!("{}{}", self.session_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CollectorError::browser(format!("{path}: {e}")))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| CollectorError::browser(format!("{path}: {e}")))?;
        unwrap_response(body)
    }

    async fn post(&self, path: &str, body: Value) -> CollectorResult<Value> {
        self.command(Method::POST, path, Some(body)).await
    }

    async fn get(&self, path: &str) -> CollectorResult<Value> {
        self.command(Method::GET, path, None).await
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    #[instrument(skip(self))]
    async fn goto(&self, url: &str) -> CollectorResult<()> {
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> CollectorResult<Vec<ElementHandle>> {
        let value = self
            .post(
                "/elements",
                json!({ "using": "css selector", "value": selector }),
            )
            .await?;
        element_handles(&value)
    }

    async fn find_all_in(
        &self,
        parent: &ElementHandle,
        selector: &str,
    ) -> CollectorResult<Vec<ElementHandle>> {
        let value = self
            .post(
                &format!("/element/{}/elements", parent.id()),
                json!({ "using": "css selector", "value": selector }),
            )
            .await?;
        element_handles(&value)
    }

    async fn click(&self, element: &ElementHandle) -> CollectorResult<()> {
        self.post(&format!("/element/{}/click", element.id()), json!({}))
            .await?;
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> CollectorResult<()> {
        self.post(&format!("/element/{}/clear", element.id()), json!({}))
            .await?;
        self.post(
            &format!("/element/{}/value", element.id()),
            json!({ "text": value }),
        )
        .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> CollectorResult<String> {
        let value = self
            .get(&format!("/element/{}/text", element.id()))
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn input_value(&self, element: &ElementHandle) -> CollectorResult<Option<String>> {
        let value = self
            .get(&format!("/element/{}/property/value", element.id()))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> CollectorResult<Option<String>> {
        let value = self
            .get(&format!("/element/{}/attribute/{}", element.id(), name))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn is_visible(&self, element: &ElementHandle) -> CollectorResult<bool> {
        let value = self
            .get(&format!("/element/{}/displayed", element.id()))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn press_key(&self, key: Key) -> CollectorResult<()> {
        let code = key_code(key);
        self.post(
            "/actions",
            json!({
                "actions": [{
                    "type": "key",
                    "id": "keyboard",
                    "actions": [
                        { "type": "keyDown", "value": code },
                        { "type": "keyUp", "value": code }
                    ]
                }]
            }),
        )
        .await?;
        Ok(())
    }

    async fn close(&self) -> CollectorResult<()> {
        if let Err(e) = self.command(Method::DELETE, "", None).await {
            warn!("关闭浏览器会话失败: {}", e);
            return Err(e);
        }
        debug!("浏览器会话已关闭");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_response_value() {
        let value = unwrap_response(json!({ "value": { "sessionId": "abc" } })).unwrap();
        assert_eq!(value["sessionId"], "abc");
    }

    #[test]
    fn test_unwrap_response_error() {
        let result = unwrap_response(json!({
            "value": { "error": "no such element", "message": "Unable to locate", "stacktrace": "" }
        }));
        match result {
            Err(CollectorError::Browser(msg)) => {
                assert_eq!(msg, "no such element: Unable to locate")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_element_handles() {
        let value = json!([
            { ELEMENT_KEY: "e-1" },
            { ELEMENT_KEY: "e-2" }
        ]);
        let handles = element_handles(&value).unwrap();
        assert_eq!(handles, vec![ElementHandle::new("e-1"), ElementHandle::new("e-2")]);

        assert!(element_handles(&json!([])).unwrap().is_empty());
        assert!(element_handles(&json!([{ "other": "x" }])).is_err());
    }

    #[test]
    fn test_capabilities() {
        let chrome = session_capabilities("chrome", true);
        let args = &chrome["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"];
        assert!(args.as_array().unwrap().contains(&json!("--headless=new")));

        let firefox = session_capabilities("firefox", false);
        assert_eq!(
            firefox["capabilities"]["alwaysMatch"]["browserName"],
            "firefox"
        );
        assert!(firefox["capabilities"]["alwaysMatch"]["moz:firefoxOptions"]["args"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_escape_key_code() {
        assert_eq!(key_code(Key::Escape), "\u{E00C}");
    }
}
