//! 诊所系统会话客户端
//!
//! 每个客户端持有一个已登录的浏览器会话。会话通过 [`ClinicClient::scoped`]
//! 使用时，无论操作成功、失败还是被取消，都会被关闭。

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use collector_config::ClinicConfig;
use collector_core::pages::{self, calendar, login, patients};
use collector_core::{
    AppointmentRecord, BrowserLauncher, BrowserSession, BrowserSessionExt, CollectorError,
    CollectorResult, ElementHandle, Key, PatientRecord,
};
use collector_infrastructure::MetricsCollector;

/// 解析日历标题中的日期，例如 "January 05, 2024" 或 "Jan 05, 2024"
pub fn parse_header_date(text: &str) -> CollectorResult<NaiveDate> {
    let text = text.trim();
    calendar::HEADER_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| CollectorError::Extraction(format!("无法解析日历日期: '{text}'")))
}

/// 默认采集昨天（本地时区）的预约
pub fn default_target_date() -> NaiveDate {
    let today = Local::now().date_naive();
    today.pred_opt().unwrap_or(today)
}

pub struct ClinicClient {
    session: Box<dyn BrowserSession>,
    config: ClinicConfig,
    metrics: MetricsCollector,
}

impl ClinicClient {
    /// 启动新的浏览器会话并登录
    pub async fn connect(
        launcher: &dyn BrowserLauncher,
        config: &ClinicConfig,
    ) -> CollectorResult<Self> {
        let session = launcher.launch().await?;
        let client = Self {
            session,
            config: config.clone(),
            metrics: MetricsCollector::new(),
        };

        if let Err(e) = client.login().await {
            let _ = client.session.close().await;
            return Err(e);
        }
        Ok(client)
    }

    /// 关闭浏览器会话
    pub async fn close(self) -> CollectorResult<()> {
        self.session.close().await
    }

    /// 打开会话、执行操作，最后总是关闭会话
    ///
    /// `cancel` 被触发时放弃正在进行的操作并返回 `Cancelled`，会话同样会被关闭。
    pub async fn scoped<T, F>(
        launcher: Arc<dyn BrowserLauncher>,
        config: &ClinicConfig,
        cancel: &CancellationToken,
        f: F,
    ) -> CollectorResult<T>
    where
        F: for<'a> FnOnce(&'a ClinicClient) -> BoxFuture<'a, CollectorResult<T>>,
    {
        if cancel.is_cancelled() {
            return Err(CollectorError::Cancelled);
        }

        let client = Self::connect(launcher.as_ref(), config).await?;
        let result = tokio::select! {
            result = f(&client) => result,
            () = cancel.cancelled() => {
                warn!("采集被取消，关闭浏览器会话");
                Err(CollectorError::Cancelled)
            }
        };
        if let Err(e) = client.close().await {
            warn!("关闭浏览器会话失败: {}", e);
        }
        result
    }

    async fn login(&self) -> CollectorResult<()> {
        let login_url = self.config.page_url(pages::LOGIN_PAGE);
        info!("登录诊所系统: {}", login_url);
        if !self.config.has_credentials() {
            warn!("未配置诊所系统登录凭据");
        }

        let attempt = async {
            self.session.goto(&login_url).await?;
            self.session
                .wait_for(login::USERNAME, self.config.selector_timeout())
                .await?;
            self.session
                .fill_selector(login::USERNAME, &self.config.email)
                .await?;
            self.session
                .fill_selector(login::PASSWORD, &self.config.password)
                .await?;
            self.session.click_selector(login::SUBMIT).await
        };

        attempt
            .await
            .map_err(|e| CollectorError::Authentication(e.to_string()))?;

        // 凭据被拒绝时页面停留在登录表单，导航栏不会出现
        self.session
            .wait_for(patients::NAV_LINK, self.config.selector_timeout())
            .await
            .map_err(|_| {
                CollectorError::Authentication("提交后未进入系统，凭据可能被拒绝".to_string())
            })?;
        info!("已登录诊所系统");
        Ok(())
    }

    /// 读取患者列表
    pub async fn list_patients(&self) -> CollectorResult<Vec<PatientRecord>> {
        let started = Instant::now();
        let patients = self.bounded(self.collect_patients()).await?;
        self.metrics
            .record_extraction("patients", patients.len(), started.elapsed().as_secs_f64());
        Ok(patients)
    }

    /// 读取指定日期（默认昨天）的全部预约
    pub async fn list_appointments_on(
        &self,
        target_date: Option<NaiveDate>,
    ) -> CollectorResult<Vec<AppointmentRecord>> {
        let target = target_date.unwrap_or_else(default_target_date);
        let started = Instant::now();
        let appointments = self.bounded(self.collect_appointments(target)).await?;
        self.metrics.record_extraction(
            "appointments",
            appointments.len(),
            started.elapsed().as_secs_f64(),
        );
        Ok(appointments)
    }

    async fn bounded<T>(
        &self,
        extraction: impl std::future::Future<Output = CollectorResult<T>>,
    ) -> CollectorResult<T> {
        let limit = self.config.extraction_timeout();
        tokio::time::timeout(limit, extraction)
            .await
            .map_err(|_| CollectorError::Timeout(format!("数据采集超过 {limit:?}")))?
    }

    async fn open_page(&self, nav_link: &str, page: &str) -> CollectorResult<()> {
        self.session
            .wait_for(nav_link, self.config.selector_timeout())
            .await?;
        let url = self.config.page_url(page);
        info!("打开页面: {}", url);
        self.session.goto(&url).await
    }

    async fn collect_patients(&self) -> CollectorResult<Vec<PatientRecord>> {
        self.open_page(patients::NAV_LINK, pages::PATIENTS_PAGE)
            .await?;
        let rows = self
            .session
            .wait_for(patients::ROWS, self.config.selector_timeout())
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(record) = self.read_patient_row(row).await? {
                records.push(record);
            }
        }

        info!("读取到 {} 名患者（共 {} 行）", records.len(), rows.len());
        Ok(records)
    }

    async fn read_patient_row(&self, row: &ElementHandle) -> CollectorResult<Option<PatientRecord>> {
        let cells = self.session.find_all_in(row, patients::CELL).await?;
        if cells.len() < PatientRecord::COLUMN_COUNT {
            debug!("跳过不完整的行: {} 列", cells.len());
            return Ok(None);
        }

        let mut texts = Vec::with_capacity(cells.len());
        for cell in &cells {
            texts.push(self.session.text(cell).await?.trim().to_string());
        }

        let (name, link) = match self
            .session
            .find_all_in(&cells[2], patients::LINK)
            .await?
            .first()
        {
            Some(anchor) => (
                self.session.text(anchor).await?.trim().to_string(),
                self.session.attribute(anchor, "href").await?,
            ),
            None => (texts[2].clone(), None),
        };

        let text = |i: usize| texts.get(i).cloned().unwrap_or_default();
        Ok(Some(PatientRecord {
            sr_no: text(0),
            patient_id: text(1),
            name,
            age: text(3),
            gender: text(4),
            mobile: text(5),
            category: text(6),
            outstanding: text(7),
            date: text(8),
            link,
        }))
    }

    async fn collect_appointments(
        &self,
        target: NaiveDate,
    ) -> CollectorResult<Vec<AppointmentRecord>> {
        self.open_page(calendar::NAV_LINK, pages::CALENDAR_PAGE)
            .await?;
        self.session
            .wait_for(calendar::DAY_VIEW_BUTTON, self.config.selector_timeout())
            .await?;
        self.session
            .click_selector(calendar::DAY_VIEW_BUTTON)
            .await?;
        tokio::time::sleep(self.config.step_delay()).await;
        self.session
            .wait_for(calendar::GRID, self.config.calendar_timeout())
            .await?;

        let steps = self.navigate_to(target).await?;
        self.metrics.record_navigation_steps(steps);
        info!("采集 {} 的预约（导航 {} 步）", target.format("%d.%m.%Y"), steps);

        let appointments = self.read_events().await?;
        info!("读取到 {} 条预约", appointments.len());
        Ok(appointments)
    }

    async fn displayed_date(&self) -> CollectorResult<NaiveDate> {
        let header = self
            .session
            .wait_for(calendar::HEADER, self.config.selector_timeout())
            .await?;
        let text = self.session.text(&header[0]).await?;
        parse_header_date(&text)
    }

    /// 逐日翻动日历直到显示目标日期，返回翻动步数
    ///
    /// 步数与耗时都有上限，超出时返回 `NavigationTimeout`。
    async fn navigate_to(&self, target: NaiveDate) -> CollectorResult<u32> {
        let started = Instant::now();
        let max_steps = self.config.max_navigation_steps;
        let time_limit = self.config.navigation_timeout();
        let mut steps = 0;

        loop {
            let current = self.displayed_date().await?;
            if current == target {
                return Ok(steps);
            }

            if steps >= max_steps || started.elapsed() >= time_limit {
                warn!(
                    "日历导航未能到达 {}，当前显示 {}，已翻动 {} 步",
                    target, current, steps
                );
                return Err(CollectorError::NavigationTimeout {
                    target: target.to_string(),
                    steps,
                });
            }

            let button = if current < target {
                calendar::NEXT_BUTTON
            } else {
                calendar::PREV_BUTTON
            };
            self.session.click_selector(button).await?;
            steps += 1;
            tokio::time::sleep(self.config.step_delay()).await;
        }
    }

    async fn read_events(&self) -> CollectorResult<Vec<AppointmentRecord>> {
        let count = self.session.find_all(calendar::EVENT).await?.len();
        debug!("日历中有 {} 个预约", count);

        let mut results = Vec::with_capacity(count);
        for index in 0..count {
            // 弹窗关闭后页面会重绘，每次重新查询
            let events = self.session.find_all(calendar::EVENT).await?;
            let Some(event) = events.get(index) else {
                warn!("预约 {} 已不在页面上，停止读取", index);
                break;
            };

            self.session.click(event).await?;
            tokio::time::sleep(self.config.settle_delay()).await;

            let modal = self
                .session
                .wait_for_visible(calendar::MODAL, self.config.modal_timeout())
                .await?;
            results.push(self.read_modal(&modal).await);

            self.close_modal(&modal).await;
            tokio::time::sleep(self.config.settle_delay()).await;
        }

        Ok(results)
    }

    async fn read_modal(&self, modal: &ElementHandle) -> AppointmentRecord {
        let mut values = Vec::with_capacity(AppointmentRecord::FIELDS.len());
        for (_, selector) in AppointmentRecord::FIELDS {
            values.push(self.field_value(modal, selector).await);
        }
        AppointmentRecord::from_values(values)
    }

    /// 优先读取表单值，没有时退回到文本内容，都取不到时为空字符串
    async fn field_value(&self, modal: &ElementHandle, selector: &str) -> String {
        let element = match self.session.find_all_in(modal, selector).await {
            Ok(found) => match found.into_iter().next() {
                Some(element) => element,
                None => return String::new(),
            },
            Err(e) => {
                warn!("查找字段 {} 失败: {}", selector, e);
                return String::new();
            }
        };

        match self.session.input_value(&element).await {
            Ok(Some(value)) if !value.trim().is_empty() => return value.trim().to_string(),
            Ok(_) => {}
            Err(e) => warn!("读取字段 {} 的值失败: {}", selector, e),
        }

        self.session
            .text(&element)
            .await
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }

    async fn close_modal(&self, modal: &ElementHandle) {
        let closed = async {
            let buttons = self
                .session
                .find_all_in(modal, calendar::MODAL_CLOSE)
                .await?;
            let button = buttons
                .first()
                .ok_or_else(|| CollectorError::Extraction("弹窗中没有关闭按钮".to_string()))?;
            self.session.click(button).await?;
            self.session
                .wait_until_hidden(calendar::MODAL, self.config.modal_close_timeout())
                .await
        };

        if let Err(e) = closed.await {
            warn!("关闭预约弹窗失败，改用 Escape: {}", e);
            if let Err(e) = self.session.press_key(Key::Escape).await {
                warn!("发送 Escape 失败: {}", e);
            }
        }
    }
}
