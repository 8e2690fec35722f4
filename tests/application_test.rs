use std::sync::Arc;
use std::time::Duration;

use collector::app::Application;
use collector::shutdown::ShutdownManager;
use collector_config::AppConfig;
use collector_core::{Dataset, SYNC_NEVER};
use collector_testing_utils::{
    fast_clinic_config, fast_retry_config, AppointmentBuilder, FakeClinicBrowser, MockCache,
    PatientRowBuilder, RecordingTransport, TestEnv,
};
use collector_worker::clinic::default_target_date;
use collector_worker::UploadOutcome;

struct Harness {
    app: Arc<Application>,
    browser: FakeClinicBrowser,
    transport: Arc<RecordingTransport>,
    cache: Arc<MockCache>,
}

async fn harness() -> Harness {
    let mut config = AppConfig::default();
    config.clinic = fast_clinic_config();
    config.uploader.retry = fast_retry_config(2);

    let target = default_target_date();
    let browser = FakeClinicBrowser::new(target)
        .with_patients(vec![PatientRowBuilder::new(1, "Ravi Kumar").truncated(4).build()])
        .with_appointments(
            target,
            vec![AppointmentBuilder::new()
                .with_date(&target.format("%d-%m-%Y").to_string())
                .with_patient("Asha Rao", "5550111")
                .build()],
        );
    let transport = Arc::new(RecordingTransport::new());
    let cache = Arc::new(MockCache::new());

    let app = Application::with_components(
        config,
        Arc::new(browser.clone()),
        transport.clone(),
        cache.clone(),
    )
    .await
    .unwrap();

    Harness {
        app: Arc::new(app),
        browser,
        transport,
        cache,
    }
}

#[tokio::test]
async fn test_startup_seeds_sync_markers_and_registers_enabled_jobs() {
    let h = harness().await;

    assert_eq!(
        h.cache.value(&Dataset::Patients.sync_key()).as_deref(),
        Some(SYNC_NEVER)
    );
    assert_eq!(
        h.cache.value(&Dataset::Appointments.sync_key()).as_deref(),
        Some(SYNC_NEVER)
    );
    assert_eq!(h.app.scheduler().job_names(), vec!["appointments".to_string()]);
    assert!(!h.app.scheduler().is_running());
}

#[tokio::test]
async fn test_run_once_uploads_then_skips_unchanged_batch() {
    let h = harness().await;

    let first = h.app.run_once(Dataset::Appointments).await.unwrap();
    assert_eq!(first, Some(UploadOutcome::Uploaded));
    assert_eq!(h.transport.sent().len(), 1);
    assert!(h.cache.value(&Dataset::Appointments.hash_key()).is_some());
    assert_ne!(
        h.cache.value(&Dataset::Appointments.sync_key()).as_deref(),
        Some(SYNC_NEVER)
    );

    let second = h.app.run_once(Dataset::Appointments).await.unwrap();
    assert_eq!(second, Some(UploadOutcome::Skipped));
    assert_eq!(h.transport.sent().len(), 1);

    let state = h.browser.state();
    assert_eq!(state.sessions_opened, 2);
    assert_eq!(state.sessions_closed, 2);
}

#[tokio::test]
async fn test_run_once_with_only_malformed_rows_touches_nothing() {
    let h = harness().await;

    let outcome = h.app.run_once(Dataset::Patients).await.unwrap();

    assert_eq!(outcome, None);
    assert!(h.transport.sent().is_empty());
    assert_eq!(
        h.cache.value(&Dataset::Patients.sync_key()).as_deref(),
        Some(SYNC_NEVER)
    );
}

#[tokio::test]
async fn test_run_serves_control_plane_until_shutdown() {
    let h = harness().await;
    let shutdown = ShutdownManager::new();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = {
        let app = h.app.clone();
        let rx = shutdown.subscribe().await;
        tokio::spawn(async move { app.run_with_listener(Some(listener), rx).await })
    };

    // 启动后第一个调度周期立即执行
    let app = h.app.clone();
    assert!(
        TestEnv::wait_for(
            || {
                let app = app.clone();
                async move {
                    app.scheduler().get_status().await["appointments"]
                        .last_run
                        .is_some()
                }
            },
            Duration::from_secs(5),
        )
        .await
    );

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["jobs"]["appointments"]["last_run"].is_string());
    assert_eq!(h.transport.sent().len(), 1);

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/trigger?job=patients"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    shutdown.shutdown().await;
    let result = tokio::time::timeout(Duration::from_secs(15), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert!(!h.app.scheduler().is_running());
}

#[tokio::test]
async fn test_shutdown_interrupts_running_sync_and_closes_session() {
    let h = harness().await;
    h.browser
        .state()
        .slow_pages
        .insert("calendar.php".to_string(), Duration::from_secs(60));
    let shutdown = ShutdownManager::new();

    let handle = {
        let app = h.app.clone();
        let rx = shutdown.subscribe().await;
        tokio::spawn(async move { app.run_with_listener(None, rx).await })
    };

    // 启动后第一个调度周期立即执行，会话打开后卡在日历页
    let browser = h.browser.clone();
    assert!(
        TestEnv::wait_for(
            || {
                let browser = browser.clone();
                async move { browser.state().sessions_opened == 1 }
            },
            Duration::from_secs(5),
        )
        .await
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    shutdown.shutdown().await;
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("shutdown waited for the stalled page")
        .unwrap();
    assert!(result.is_ok());

    let state = h.browser.state();
    assert_eq!(state.sessions_opened, 1);
    assert_eq!(state.sessions_closed, 1);
    assert!(h.transport.sent().is_empty());
    assert_eq!(
        h.cache.value(&Dataset::Appointments.sync_key()).as_deref(),
        Some(SYNC_NEVER)
    );
}
