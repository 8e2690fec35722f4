//! Test doubles for the capability traits
//!
//! `FakeClinicBrowser` scripts the clinic web application: a login form, a
//! patient table and a day-view calendar whose header date moves with the
//! next/prev buttons. Element handles are plain strings such as `row:2` or
//! `field:#p_name`.

use async_trait::async_trait;
use chrono::NaiveDate;
use collector_core::pages::{self, calendar, login, patients};
use collector_core::{
    AppointmentRecord, BrowserLauncher, BrowserSession, CacheService, CollectorError,
    CollectorResult, Dataset, ElementHandle, Key, UploadTransport,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One row of the fake patient table
#[derive(Debug, Clone)]
pub struct FakePatientRow {
    pub cells: Vec<String>,
    /// href of the anchor inside the name cell
    pub link: Option<String>,
}

/// Page content, browser state and interaction counters of the fake clinic
#[derive(Debug)]
pub struct FakeClinicState {
    pub displayed_date: NaiveDate,
    pub header_override: Option<String>,
    pub patients: Vec<FakePatientRow>,
    pub appointments: HashMap<NaiveDate, Vec<AppointmentRecord>>,
    pub missing_selectors: HashSet<String>,
    pub close_button_broken: bool,
    pub launch_fails: bool,
    pub credentials_rejected: bool,
    /// Pages whose navigation takes this long to finish
    pub slow_pages: HashMap<String, Duration>,

    pub page: String,
    pub logged_in: bool,
    pub day_view: bool,
    pub open_modal: Option<usize>,

    pub next_clicks: u32,
    pub prev_clicks: u32,
    pub escape_presses: u32,
    pub sessions_opened: u32,
    pub sessions_closed: u32,
    pub visited: Vec<String>,
    pub filled: Vec<(String, String)>,
}

impl FakeClinicState {
    fn new(displayed_date: NaiveDate) -> Self {
        Self {
            displayed_date,
            header_override: None,
            patients: Vec::new(),
            appointments: HashMap::new(),
            missing_selectors: HashSet::new(),
            close_button_broken: false,
            launch_fails: false,
            credentials_rejected: false,
            slow_pages: HashMap::new(),
            page: String::new(),
            logged_in: false,
            day_view: false,
            open_modal: None,
            next_clicks: 0,
            prev_clicks: 0,
            escape_presses: 0,
            sessions_opened: 0,
            sessions_closed: 0,
            visited: Vec::new(),
            filled: Vec::new(),
        }
    }

    fn on_calendar(&self) -> bool {
        self.page == pages::CALENDAR_PAGE
    }

    fn events(&self) -> &[AppointmentRecord] {
        self.appointments
            .get(&self.displayed_date)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn field_value(&self, selector: &str) -> Option<String> {
        let record = self.events().get(self.open_modal?)?;
        let value = match selector {
            "#app_date" => &record.date,
            "#clinic_list" => &record.department,
            "#p_name" => &record.patient_name,
            "#p_mobile_no" => &record.patient_phone,
            "#start_time" => &record.start_time,
            "#end_time" => &record.end_time,
            "#doc_list" => &record.doctor,
            "#purpose_visit" => &record.remark,
            "#status" => &record.status,
            _ => return None,
        };
        Some(value.clone())
    }

    fn query(&self, selector: &str) -> Vec<String> {
        if self.missing_selectors.contains(selector) {
            return Vec::new();
        }

        let present = match selector {
            login::USERNAME | login::PASSWORD | login::SUBMIT => {
                self.page == pages::LOGIN_PAGE
            }
            patients::NAV_LINK | calendar::NAV_LINK => self.logged_in,
            patients::ROWS if self.page == pages::PATIENTS_PAGE => {
                return (0..self.patients.len()).map(|i| format!("row:{i}")).collect();
            }
            calendar::DAY_VIEW_BUTTON
            | calendar::HEADER
            | calendar::NEXT_BUTTON
            | calendar::PREV_BUTTON => self.on_calendar(),
            calendar::GRID => self.on_calendar() && self.day_view,
            calendar::EVENT if self.on_calendar() && self.day_view => {
                return (0..self.events().len())
                    .map(|i| format!("event:{i}"))
                    .collect();
            }
            calendar::MODAL => self.open_modal.is_some(),
            _ => false,
        };

        if present {
            vec![format!("el:{selector}")]
        } else {
            Vec::new()
        }
    }

    fn query_in(&self, parent: &str, selector: &str) -> Vec<String> {
        if self.missing_selectors.contains(selector) {
            return Vec::new();
        }

        if let Some(row) = parent.strip_prefix("row:") {
            let Ok(i) = row.parse::<usize>() else {
                return Vec::new();
            };
            if selector != patients::CELL {
                return Vec::new();
            }
            let cells = self.patients.get(i).map_or(0, |r| r.cells.len());
            return (0..cells).map(|j| format!("cell:{i}:{j}")).collect();
        }

        if let Some(cell) = parent.strip_prefix("cell:") {
            if selector != patients::LINK {
                return Vec::new();
            }
            let row = cell
                .split(':')
                .next()
                .and_then(|i| i.parse::<usize>().ok())
                .and_then(|i| self.patients.get(i));
            return match row {
                Some(row) if cell.ends_with(":2") && row.link.is_some() => {
                    vec![format!("link:{cell}")]
                }
                _ => Vec::new(),
            };
        }

        if parent == format!("el:{}", calendar::MODAL) && self.open_modal.is_some() {
            if selector == calendar::MODAL_CLOSE {
                return vec!["close".to_string()];
            }
            if self.field_value(selector).is_some() {
                return vec![format!("field:{selector}")];
            }
        }

        Vec::new()
    }

    fn cell_text(&self, id: &str) -> Option<String> {
        let mut parts = id.split(':');
        let i = parts.next()?.parse::<usize>().ok()?;
        let j = parts.next()?.parse::<usize>().ok()?;
        self.patients.get(i)?.cells.get(j).cloned()
    }
}

/// Scripted clinic application
#[derive(Debug, Clone)]
pub struct FakeClinicBrowser {
    state: Arc<Mutex<FakeClinicState>>,
}

impl FakeClinicBrowser {
    /// The calendar opens on `displayed_date`
    pub fn new(displayed_date: NaiveDate) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeClinicState::new(displayed_date))),
        }
    }

    pub fn with_patients(self, rows: Vec<FakePatientRow>) -> Self {
        self.state().patients = rows;
        self
    }

    pub fn with_appointments(self, date: NaiveDate, records: Vec<AppointmentRecord>) -> Self {
        self.state().appointments.insert(date, records);
        self
    }

    /// Replace the calendar header text
    pub fn with_header(self, text: &str) -> Self {
        self.state().header_override = Some(text.to_string());
        self
    }

    /// Make a selector never match
    pub fn with_missing_selector(self, selector: &str) -> Self {
        self.state().missing_selectors.insert(selector.to_string());
        self
    }

    /// The modal close button does nothing, only Escape dismisses the modal
    pub fn with_broken_close_button(self) -> Self {
        self.state().close_button_broken = true;
        self
    }

    pub fn with_failing_launch(self) -> Self {
        self.state().launch_fails = true;
        self
    }

    /// Submitting the login form leaves the browser on the login page
    pub fn with_rejected_credentials(self) -> Self {
        self.state().credentials_rejected = true;
        self
    }

    /// Navigating to `page` (e.g. `patient_list.php`) blocks for `delay`
    pub fn with_slow_page(self, page: &str, delay: Duration) -> Self {
        self.state().slow_pages.insert(page.to_string(), delay);
        self
    }

    /// Inspect or mutate the shared state
    pub fn state(&self) -> MutexGuard<'_, FakeClinicState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl BrowserLauncher for FakeClinicBrowser {
    async fn launch(&self) -> CollectorResult<Box<dyn BrowserSession>> {
        let mut state = self.state();
        if state.launch_fails {
            return Err(CollectorError::browser("fake browser failed to start"));
        }
        state.sessions_opened += 1;
        state.page.clear();
        state.logged_in = false;
        state.day_view = false;
        state.open_modal = None;

        Ok(Box::new(FakeClinicSession {
            state: self.state.clone(),
        }))
    }
}

/// A session opened by [`FakeClinicBrowser`]
pub struct FakeClinicSession {
    state: Arc<Mutex<FakeClinicState>>,
}

impl FakeClinicSession {
    fn state(&self) -> MutexGuard<'_, FakeClinicState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl BrowserSession for FakeClinicSession {
    async fn goto(&self, url: &str) -> CollectorResult<()> {
        let page = url.rsplit('/').next().unwrap_or_default().to_string();
        let delay = self.state().slow_pages.get(&page).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.visited.push(url.to_string());
        state.page = page;
        state.day_view = false;
        state.open_modal = None;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> CollectorResult<Vec<ElementHandle>> {
        Ok(self
            .state()
            .query(selector)
            .into_iter()
            .map(ElementHandle::new)
            .collect())
    }

    async fn find_all_in(
        &self,
        parent: &ElementHandle,
        selector: &str,
    ) -> CollectorResult<Vec<ElementHandle>> {
        Ok(self
            .state()
            .query_in(parent.id(), selector)
            .into_iter()
            .map(ElementHandle::new)
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> CollectorResult<()> {
        let mut state = self.state();
        let id = element.id();

        if let Some(index) = id.strip_prefix("event:") {
            state.open_modal = index.parse().ok();
            return Ok(());
        }

        match id.strip_prefix("el:").unwrap_or(id) {
            login::SUBMIT if state.credentials_rejected => {}
            login::SUBMIT => {
                state.logged_in = true;
                state.page = "dashboard.php".to_string();
            }
            calendar::DAY_VIEW_BUTTON => state.day_view = true,
            calendar::NEXT_BUTTON => {
                state.next_clicks += 1;
                state.displayed_date = state.displayed_date.succ_opt().unwrap();
            }
            calendar::PREV_BUTTON => {
                state.prev_clicks += 1;
                state.displayed_date = state.displayed_date.pred_opt().unwrap();
            }
            "close" => {
                if !state.close_button_broken {
                    state.open_modal = None;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> CollectorResult<()> {
        let selector = element.id().strip_prefix("el:").unwrap_or(element.id());
        self.state()
            .filled
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> CollectorResult<String> {
        let state = self.state();
        let id = element.id();

        if let Some(cell) = id.strip_prefix("cell:") {
            return Ok(state.cell_text(cell).unwrap_or_default());
        }
        if let Some(cell) = id.strip_prefix("link:") {
            return Ok(state.cell_text(cell).unwrap_or_default());
        }
        if let Some(selector) = id.strip_prefix("field:") {
            return Ok(state.field_value(selector).unwrap_or_default());
        }
        if id == format!("el:{}", calendar::HEADER) {
            return Ok(state.header_override.clone().unwrap_or_else(|| {
                format!(" {} ", state.displayed_date.format("%B %d, %Y"))
            }));
        }
        Ok(String::new())
    }

    async fn input_value(&self, element: &ElementHandle) -> CollectorResult<Option<String>> {
        match element.id().strip_prefix("field:") {
            // status is a plain label in the modal, not a form control
            Some("#status") | None => Ok(None),
            Some(selector) => Ok(self.state().field_value(selector)),
        }
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> CollectorResult<Option<String>> {
        let state = self.state();
        match element.id().strip_prefix("link:") {
            Some(cell) if name == "href" => {
                let row = cell
                    .split(':')
                    .next()
                    .and_then(|i| i.parse::<usize>().ok())
                    .and_then(|i| state.patients.get(i));
                Ok(row.and_then(|r| r.link.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn is_visible(&self, element: &ElementHandle) -> CollectorResult<bool> {
        let state = self.state();
        if element.id() == format!("el:{}", calendar::MODAL) {
            return Ok(state.open_modal.is_some());
        }
        Ok(true)
    }

    async fn press_key(&self, key: Key) -> CollectorResult<()> {
        let mut state = self.state();
        if key == Key::Escape {
            state.escape_presses += 1;
            state.open_modal = None;
        }
        Ok(())
    }

    async fn close(&self) -> CollectorResult<()> {
        self.state().sessions_closed += 1;
        Ok(())
    }
}

/// Upload transport that records payloads and can fail on demand
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(Dataset, Value)>>>,
    failures: Arc<Mutex<VecDeque<CollectorError>>>,
    attempts: Arc<Mutex<u32>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error returned by the next call
    pub fn fail_next(&self, error: CollectorError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Successfully delivered payloads
    pub fn sent(&self) -> Vec<(Dataset, Value)> {
        self.sent.lock().unwrap().clone()
    }

    /// All calls, including failed ones
    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl UploadTransport for RecordingTransport {
    async fn send(&self, dataset: Dataset, payload: &Value) -> CollectorResult<()> {
        *self.attempts.lock().unwrap() += 1;
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.sent.lock().unwrap().push((dataset, payload.clone()));
        Ok(())
    }
}

/// Cache double that remembers the TTL of every write
#[derive(Debug, Clone, Default)]
pub struct MockCache {
    values: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<Vec<(String, Option<Duration>)>>>,
    unavailable: Arc<Mutex<bool>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Every operation fails with a cache error while set
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn writes(&self) -> Vec<(String, Option<Duration>)> {
        self.writes.lock().unwrap().clone()
    }

    fn check(&self) -> CollectorResult<()> {
        if *self.unavailable.lock().unwrap() {
            Err(CollectorError::Cache("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheService for MockCache {
    async fn get(&self, key: &str) -> CollectorResult<Option<String>> {
        self.check()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CollectorResult<()> {
        self.check()?;
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.writes.lock().unwrap().push((key.to_string(), ttl));
        Ok(())
    }

    async fn exists(&self, key: &str) -> CollectorResult<bool> {
        self.check()?;
        Ok(self.values.lock().unwrap().contains_key(key))
    }

    async fn delete(&self, key: &str) -> CollectorResult<bool> {
        self.check()?;
        Ok(self.values.lock().unwrap().remove(key).is_some())
    }
}
