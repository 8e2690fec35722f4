use async_trait::async_trait;
use collector_errors::{CollectorError, CollectorResult};
use std::time::Duration;
use tokio::time::Instant;

/// 浏览器中某个元素的不透明引用
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// 可发送给页面的按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
}

/// 一个已打开的浏览器会话
///
/// 选择器均为 CSS 选择器。查询类方法在没有匹配时返回空列表而不是错误，
/// 等待逻辑由 [`BrowserSessionExt`] 在此之上实现。
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 打开指定地址
    async fn goto(&self, url: &str) -> CollectorResult<()>;

    /// 查询整页中匹配的元素
    async fn find_all(&self, selector: &str) -> CollectorResult<Vec<ElementHandle>>;

    /// 查询某个元素内部匹配的元素
    async fn find_all_in(
        &self,
        parent: &ElementHandle,
        selector: &str,
    ) -> CollectorResult<Vec<ElementHandle>>;

    async fn click(&self, element: &ElementHandle) -> CollectorResult<()>;

    /// 向输入框填入文本
    async fn fill(&self, element: &ElementHandle, value: &str) -> CollectorResult<()>;

    /// 元素的可见文本
    async fn text(&self, element: &ElementHandle) -> CollectorResult<String>;

    /// 表单元素的当前值，非表单元素返回 None
    async fn input_value(&self, element: &ElementHandle) -> CollectorResult<Option<String>>;

    async fn attribute(&self, element: &ElementHandle, name: &str)
        -> CollectorResult<Option<String>>;

    async fn is_visible(&self, element: &ElementHandle) -> CollectorResult<bool>;

    /// 向当前焦点发送按键
    async fn press_key(&self, key: Key) -> CollectorResult<()>;

    /// 关闭会话，之后不能再使用
    async fn close(&self) -> CollectorResult<()>;
}

/// 浏览器启动器，每次调用得到一个全新的会话
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> CollectorResult<Box<dyn BrowserSession>>;
}

/// 轮询等待的间隔
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 基于轮询的等待与便捷操作
#[async_trait]
pub trait BrowserSessionExt: BrowserSession {
    /// 等待选择器至少匹配一个元素
    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> CollectorResult<Vec<ElementHandle>> {
        let deadline = Instant::now() + timeout;
        loop {
            let found = self.find_all(selector).await?;
            if !found.is_empty() {
                return Ok(found);
            }
            if Instant::now() >= deadline {
                return Err(CollectorError::extraction_timeout(selector));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// 等待第一个可见的匹配元素
    async fn wait_for_visible(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> CollectorResult<ElementHandle> {
        let deadline = Instant::now() + timeout;
        loop {
            for element in self.find_all(selector).await? {
                if self.is_visible(&element).await.unwrap_or(false) {
                    return Ok(element);
                }
            }
            if Instant::now() >= deadline {
                return Err(CollectorError::extraction_timeout(selector));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// 等待所有匹配元素都不可见（或已从页面移除）
    async fn wait_until_hidden(&self, selector: &str, timeout: Duration) -> CollectorResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let mut any_visible = false;
            for element in self.find_all(selector).await? {
                if self.is_visible(&element).await.unwrap_or(false) {
                    any_visible = true;
                    break;
                }
            }
            if !any_visible {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CollectorError::extraction_timeout(selector));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// 点击第一个匹配的元素
    async fn click_selector(&self, selector: &str) -> CollectorResult<()> {
        let element = self.first(selector).await?;
        self.click(&element).await
    }

    /// 向第一个匹配的输入框填入文本
    async fn fill_selector(&self, selector: &str, value: &str) -> CollectorResult<()> {
        let element = self.first(selector).await?;
        self.fill(&element, value).await
    }

    async fn first(&self, selector: &str) -> CollectorResult<ElementHandle> {
        self.find_all(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CollectorError::Extraction(format!("页面中没有元素: {selector}")))
    }
}

impl<T: BrowserSession + ?Sized> BrowserSessionExt for T {}
