use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::validation::{ConfigValidator, ValidationUtils};

/// 诊所管理系统（浏览器会话）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    /// 目标站点根路径，例如 https://clinicia.com/app
    pub base_url: String,
    pub email: String,
    pub password: String,
    /// WebDriver 服务地址（chromedriver / geckodriver）
    pub webdriver_url: String,
    /// chrome 或 firefox
    pub browser: String,
    pub headless: bool,
    /// 普通元素等待超时
    pub selector_timeout_seconds: u64,
    /// 日历表格首次渲染的等待超时
    pub calendar_timeout_seconds: u64,
    /// 预约详情弹窗出现的等待超时
    pub modal_timeout_ms: u64,
    /// 预约详情弹窗关闭的等待超时
    pub modal_close_timeout_ms: u64,
    /// 日历翻页后的等待时间
    pub step_delay_ms: u64,
    /// 打开/关闭弹窗后的等待时间
    pub settle_delay_ms: u64,
    /// 日历逐日翻页的最大步数
    pub max_navigation_steps: u32,
    /// 日历逐日翻页的总时长上限
    pub navigation_timeout_seconds: u64,
    /// 单次列表提取的总时长上限
    pub extraction_timeout_seconds: u64,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            base_url: "https://clinicia.com/app".to_string(),
            email: String::new(),
            password: String::new(),
            webdriver_url: "http://localhost:9515".to_string(),
            browser: "chrome".to_string(),
            headless: true,
            selector_timeout_seconds: 30,
            calendar_timeout_seconds: 60,
            modal_timeout_ms: 2_000,
            modal_close_timeout_ms: 5_000,
            step_delay_ms: 1_000,
            settle_delay_ms: 500,
            max_navigation_steps: 400,
            navigation_timeout_seconds: 600,
            extraction_timeout_seconds: 900,
        }
    }
}

impl ClinicConfig {
    pub fn has_credentials(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_seconds)
    }

    pub fn calendar_timeout(&self) -> Duration {
        Duration::from_secs(self.calendar_timeout_seconds)
    }

    pub fn modal_timeout(&self) -> Duration {
        Duration::from_millis(self.modal_timeout_ms)
    }

    pub fn modal_close_timeout(&self) -> Duration {
        Duration::from_millis(self.modal_close_timeout_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_seconds)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_seconds)
    }

    /// 拼接站点页面地址
    pub fn page_url(&self, page: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), page)
    }
}

impl ConfigValidator for ClinicConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_url(&self.base_url, "clinic.base_url", &["http", "https"])?;
        ValidationUtils::validate_url(
            &self.webdriver_url,
            "clinic.webdriver_url",
            &["http", "https"],
        )?;
        if !matches!(self.browser.as_str(), "chrome" | "firefox") {
            return Err(crate::ConfigError::Validation(
                "clinic.browser must be either chrome or firefox".to_string(),
            ));
        }
        ValidationUtils::validate_timeout_seconds(
            self.selector_timeout_seconds,
            "clinic.selector_timeout_seconds",
        )?;
        ValidationUtils::validate_timeout_seconds(
            self.calendar_timeout_seconds,
            "clinic.calendar_timeout_seconds",
        )?;
        ValidationUtils::validate_positive(self.modal_timeout_ms, "clinic.modal_timeout_ms")?;
        ValidationUtils::validate_positive(
            self.modal_close_timeout_ms,
            "clinic.modal_close_timeout_ms",
        )?;
        ValidationUtils::validate_positive(
            self.max_navigation_steps as u64,
            "clinic.max_navigation_steps",
        )?;
        ValidationUtils::validate_timeout_seconds(
            self.navigation_timeout_seconds,
            "clinic.navigation_timeout_seconds",
        )?;
        ValidationUtils::validate_timeout_seconds(
            self.extraction_timeout_seconds,
            "clinic.extraction_timeout_seconds",
        )?;
        Ok(())
    }
}
