//! 定时任务调度器
//!
//! 每个调度周期按注册顺序检查所有任务，对到期任务依次执行。同一周期内的任务串行运行，
//! 慢任务会推迟其后任务的执行。暂停后当前任务会运行完毕，本周期剩余的任务不再执行。
//! 手动触发与周期执行共享每个任务的互斥锁，同一任务同一时刻最多只有一次执行。
//!
//! 停止是终态：取消令牌被触发，调度循环和所有后台触发的执行都会被等待结束，
//! 不会被中止。任务通过 [`JobScheduler::cancellation_token`] 感知停止。

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use collector_config::SchedulerConfig;
use collector_core::{CollectorError, CollectorResult, JobStatus, SchedulerControl};
use collector_infrastructure::MetricsCollector;

/// 任务动作：无参数的异步操作
pub type JobAction = Arc<dyn Fn() -> BoxFuture<'static, CollectorResult<()>> + Send + Sync>;

struct Job {
    name: String,
    interval: Duration,
    action: JobAction,
    /// 最近一次成功完成的时间
    last_run: tokio::sync::RwLock<Option<DateTime<Utc>>>,
    /// 周期执行与手动触发共用
    run_lock: Mutex<()>,
}

impl Job {
    async fn is_due(&self, now: DateTime<Utc>) -> bool {
        match *self.last_run.read().await {
            None => true,
            Some(last) => match (now - last).to_std() {
                Ok(elapsed) => elapsed >= self.interval,
                // last_run 晚于 now（例如刚被手动触发过）
                Err(_) => false,
            },
        }
    }
}

struct Inner {
    jobs: RwLock<Vec<Arc<Job>>>,
    tick: Duration,
    running: AtomicBool,
    generation: AtomicU64,
    wake: Notify,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    /// 手动触发的后台执行
    tracker: TaskTracker,
    cancel: CancellationToken,
    metrics: MetricsCollector,
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    fn snapshot(&self) -> Vec<Arc<Job>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn find(&self, name: &str) -> Option<Arc<Job>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|job| job.name == name)
            .cloned()
    }

    /// 执行任务动作；调用方必须已持有该任务的 run_lock
    async fn execute(&self, job: &Job) -> CollectorResult<()> {
        info!("执行任务: {}", job.name);
        let started = Instant::now();

        match (job.action)().await {
            Ok(()) => {
                let finished = Utc::now();
                *job.last_run.write().await = Some(finished);
                let elapsed = started.elapsed().as_secs_f64();
                self.metrics.record_job_run(&job.name, elapsed);
                info!("任务 {} 执行成功，耗时 {:.2} 秒", job.name, elapsed);
                Ok(())
            }
            Err(CollectorError::Cancelled) => {
                info!("任务 {} 因调度器停止而取消", job.name);
                Err(CollectorError::Cancelled)
            }
            Err(e) => {
                self.metrics.record_job_failure(&job.name, e.kind());
                error!("任务 {} 执行失败: {}", job.name, e);
                Err(e)
            }
        }
    }

    /// 执行到期任务；给定代数时，调度循环被暂停或替换后不再开始新的任务
    async fn run_due_jobs(&self, now: DateTime<Utc>, generation: Option<u64>) -> Vec<String> {
        let mut executed = Vec::new();

        for job in self.snapshot() {
            if generation.is_some_and(|g| !self.is_current(g)) {
                debug!("调度器已暂停，跳过本周期剩余任务");
                break;
            }
            if !job.is_due(now).await {
                continue;
            }

            let _guard = job.run_lock.lock().await;
            // 等锁期间可能刚被手动触发过，或调度器已被暂停
            if generation.is_some_and(|g| !self.is_current(g)) {
                debug!("调度器已暂停，任务 {} 不再执行", job.name);
                break;
            }
            if !job.is_due(now).await {
                debug!("任务 {} 已在等待期间完成，跳过", job.name);
                continue;
            }

            // 失败只记录日志，不影响其他任务，下个周期重试
            let _ = self.execute(&job).await;
            executed.push(job.name.clone());
        }

        executed
    }

    async fn run_loop(self: Arc<Self>, generation: u64) {
        info!("调度器已启动，检查间隔 {:?}", self.tick);

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if !self.is_current(generation) {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.wake.notified() => continue,
            }

            if !self.is_current(generation) {
                break;
            }

            let executed = self.run_due_jobs(Utc::now(), Some(generation)).await;
            if !executed.is_empty() {
                debug!("本周期执行了任务: {:?}", executed);
            }
        }

        info!("调度循环已退出");
    }
}

/// 任务调度器句柄，可廉价克隆并在组件之间共享
#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<Inner>,
}

impl JobScheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                jobs: RwLock::new(Vec::new()),
                tick,
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                wake: Notify::new(),
                loop_handle: Mutex::new(None),
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
                metrics: MetricsCollector::new(),
            }),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.tick())
    }

    /// 注册任务，名称重复时返回 `DuplicateJob`
    pub fn add_job<F, Fut>(
        &self,
        name: impl Into<String>,
        interval: Duration,
        action: F,
    ) -> CollectorResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CollectorResult<()>> + Send + 'static,
    {
        let name = name.into();
        let action: JobAction =
            Arc::new(move || -> BoxFuture<'static, CollectorResult<()>> { Box::pin(action()) });

        let mut jobs = self
            .inner
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if jobs.iter().any(|job| job.name == name) {
            return Err(CollectorError::duplicate_job(name));
        }

        info!("注册任务 '{}'，间隔 {} 秒", name, interval.as_secs());
        jobs.push(Arc::new(Job {
            name,
            interval,
            action,
            last_run: tokio::sync::RwLock::new(None),
            run_lock: Mutex::new(()),
        }));
        Ok(())
    }

    /// 按注册顺序返回任务名
    pub fn job_names(&self) -> Vec<String> {
        self.inner
            .snapshot()
            .iter()
            .map(|job| job.name.clone())
            .collect()
    }

    pub fn has_job(&self, name: &str) -> bool {
        self.inner.find(name).is_some()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// 调度器停止时被触发的令牌，任务用它中断正在进行的采集
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// 在给定时刻执行一次调度检查，返回实际执行的任务名
    pub async fn run_due_jobs(&self, now: DateTime<Utc>) -> Vec<String> {
        self.inner.run_due_jobs(now, None).await
    }

    /// 立即执行任务，不影响正常调度周期
    pub async fn trigger_now(&self, name: &str) -> CollectorResult<()> {
        let job = self.inner.find(name).ok_or_else(|| {
            warn!("尝试触发未知任务: {}", name);
            CollectorError::unknown_job(name)
        })?;

        info!("手动触发任务: {}", name);
        let _guard = job.run_lock.lock().await;
        self.inner.execute(&job).await
    }

    /// 在调度器持有的后台任务中执行一次任务，立即返回
    pub fn trigger_in_background(&self, name: &str) -> CollectorResult<()> {
        if self.inner.cancel.is_cancelled() {
            warn!("调度器已停止，拒绝触发任务: {}", name);
            return Err(CollectorError::Cancelled);
        }
        if !self.has_job(name) {
            warn!("尝试触发未知任务: {}", name);
            return Err(CollectorError::unknown_job(name));
        }

        let scheduler = self.clone();
        let name = name.to_string();
        self.inner.tracker.spawn(async move {
            if let Err(e) = scheduler.trigger_now(&name).await {
                warn!("手动触发的任务 {} 执行失败: {}", name, e);
            }
        });
        Ok(())
    }

    pub async fn get_status(&self) -> BTreeMap<String, JobStatus> {
        self.status_at(Utc::now()).await
    }

    pub async fn status_at(&self, now: DateTime<Utc>) -> BTreeMap<String, JobStatus> {
        let mut status = BTreeMap::new();
        for job in self.inner.snapshot() {
            let last_run = *job.last_run.read().await;
            status.insert(
                job.name.clone(),
                JobStatus::compute(last_run, job.interval, now),
            );
        }
        status
    }

    /// 启动调度循环，已在运行或已停止时返回 false
    pub async fn start(&self) -> bool {
        if self.inner.cancel.is_cancelled() {
            warn!("调度器已停止，不能再次启动");
            return false;
        }
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = tokio::spawn(self.inner.clone().run_loop(generation));

        // 旧循环发现代数变化后会自行退出
        *self.inner.loop_handle.lock().await = Some(handle);
        true
    }

    /// 暂停调度循环，正在执行的任务会运行完毕
    pub async fn pause(&self) {
        if self.inner.running.swap(false, Ordering::SeqCst) {
            info!("调度器已暂停");
        }
        self.inner.wake.notify_one();
    }

    pub async fn resume(&self) -> bool {
        let started = self.start().await;
        if started {
            info!("调度器已恢复");
        }
        started
    }

    /// 停止调度：触发取消令牌，等待调度循环和后台触发的执行全部结束
    pub async fn stop(&self) {
        self.pause().await;
        self.inner.cancel.cancel();
        self.inner.tracker.close();

        let handle = self.inner.loop_handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("调度循环异常退出: {}", e);
            }
        }

        if !self.inner.tracker.is_empty() {
            info!("等待 {} 个手动触发的任务结束", self.inner.tracker.len());
        }
        self.inner.tracker.wait().await;
        info!("调度器已停止");
    }
}

#[async_trait]
impl SchedulerControl for JobScheduler {
    async fn job_status(&self) -> BTreeMap<String, JobStatus> {
        self.get_status().await
    }

    fn trigger_in_background(&self, name: &str) -> CollectorResult<()> {
        JobScheduler::trigger_in_background(self, name)
    }

    async fn pause(&self) {
        JobScheduler::pause(self).await
    }

    async fn resume(&self) -> bool {
        JobScheduler::resume(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    fn counting_job(
        scheduler: &JobScheduler,
        name: &str,
        interval: Duration,
    ) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        scheduler
            .add_job(name, interval, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();
        count
    }

    async fn set_last_run(scheduler: &JobScheduler, name: &str, at: Option<DateTime<Utc>>) {
        let job = scheduler.inner.find(name).unwrap();
        *job.last_run.write().await = at;
    }

    async fn last_run(scheduler: &JobScheduler, name: &str) -> Option<DateTime<Utc>> {
        *scheduler.inner.find(name).unwrap().last_run.read().await
    }

    async fn wait_for_count(count: &AtomicUsize, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while count.load(Ordering::SeqCst) < expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job did not run in time");
    }

    #[tokio::test]
    async fn test_never_run_job_runs_on_first_tick() {
        let scheduler = JobScheduler::new(Duration::from_secs(60));
        let count = counting_job(&scheduler, "appointments", FIVE_MINUTES);

        let executed = scheduler.run_due_jobs(Utc::now()).await;

        assert_eq!(executed, vec!["appointments".to_string()]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(last_run(&scheduler, "appointments").await.is_some());
    }

    #[tokio::test]
    async fn test_recent_job_is_not_run() {
        let scheduler = JobScheduler::new(Duration::from_secs(60));
        let count = counting_job(&scheduler, "appointments", FIVE_MINUTES);
        let now = Utc::now();
        set_last_run(&scheduler, "appointments", Some(now - chrono::Duration::seconds(100))).await;

        let executed = scheduler.run_due_jobs(now).await;

        assert!(executed.is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_rerun_before_interval_elapses() {
        let scheduler = JobScheduler::new(Duration::from_secs(60));
        let count = counting_job(&scheduler, "appointments", FIVE_MINUTES);

        scheduler.run_due_jobs(Utc::now()).await;
        let finished = last_run(&scheduler, "appointments").await.unwrap();

        let just_before = finished + chrono::Duration::seconds(299);
        assert!(scheduler.run_due_jobs(just_before).await.is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let at_interval = finished + chrono::Duration::seconds(300);
        assert_eq!(scheduler.run_due_jobs(at_interval).await.len(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_job_keeps_last_run_and_others_continue() {
        let scheduler = JobScheduler::new(Duration::from_secs(60));
        scheduler
            .add_job("patients", FIVE_MINUTES, || async {
                Err(CollectorError::extraction_timeout("table#datatable tbody tr"))
            })
            .unwrap();
        let count = counting_job(&scheduler, "appointments", FIVE_MINUTES);

        let executed = scheduler.run_due_jobs(Utc::now()).await;

        assert_eq!(executed, vec!["patients".to_string(), "appointments".to_string()]);
        assert!(last_run(&scheduler, "patients").await.is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // 失败的任务在下个周期重试
        let executed = scheduler.run_due_jobs(Utc::now()).await;
        assert_eq!(executed, vec!["patients".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_job_rejected() {
        let scheduler = JobScheduler::new(Duration::from_secs(60));
        counting_job(&scheduler, "appointments", FIVE_MINUTES);

        let result = scheduler.add_job("appointments", FIVE_MINUTES, || async { Ok(()) });
        assert!(matches!(result, Err(CollectorError::DuplicateJob { .. })));
        assert_eq!(scheduler.job_names(), vec!["appointments".to_string()]);
    }

    #[tokio::test]
    async fn test_trigger_unknown_job() {
        let scheduler = JobScheduler::new(Duration::from_secs(60));
        let result = scheduler.trigger_now("invoices").await;
        assert!(matches!(result, Err(CollectorError::UnknownJob { .. })));
    }

    #[tokio::test]
    async fn test_trigger_runs_immediately_and_updates_last_run() {
        let scheduler = JobScheduler::new(Duration::from_secs(60));
        let count = counting_job(&scheduler, "appointments", FIVE_MINUTES);
        let recent = Utc::now() - chrono::Duration::seconds(10);
        set_last_run(&scheduler, "appointments", Some(recent)).await;

        scheduler.trigger_now("appointments").await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(last_run(&scheduler, "appointments").await.unwrap() > recent);
    }

    #[tokio::test]
    async fn test_trigger_and_tick_do_not_overlap() {
        let scheduler = JobScheduler::new(Duration::from_secs(60));
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));

        let (a, m, r) = (active.clone(), max_active.clone(), runs.clone());
        scheduler
            .add_job("appointments", FIVE_MINUTES, move || {
                let (a, m, r) = (a.clone(), m.clone(), r.clone());
                async move {
                    let now_active = a.fetch_add(1, Ordering::SeqCst) + 1;
                    m.fetch_max(now_active, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    a.fetch_sub(1, Ordering::SeqCst);
                    r.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        let tick_at = Utc::now();
        let trigger = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.trigger_now("appointments").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let executed = scheduler.run_due_jobs(tick_at).await;
        trigger.await.unwrap().unwrap();

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        // 周期检查等到锁后发现任务刚完成，不再重复执行
        assert!(executed.is_empty());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_reports_minutes() {
        let scheduler = JobScheduler::new(Duration::from_secs(60));
        counting_job(&scheduler, "appointments", FIVE_MINUTES);
        counting_job(&scheduler, "patients", Duration::from_secs(900));

        let now = Utc::now();
        set_last_run(&scheduler, "patients", Some(now - chrono::Duration::seconds(300))).await;

        let status = scheduler.status_at(now).await;
        let appointments = &status["appointments"];
        assert_eq!(appointments.last_run, None);
        assert_eq!(appointments.interval_minutes, 5);
        assert_eq!(appointments.next_run_in, 0);

        let patients = &status["patients"];
        assert!(patients.last_run.is_some());
        assert_eq!(patients.interval_minutes, 15);
        assert_eq!(patients.next_run_in, 10);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let scheduler = JobScheduler::new(Duration::from_secs(3600));
        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);
        assert!(scheduler.is_running());
        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_pause_then_resume_runs_overdue_job() {
        let scheduler = JobScheduler::new(Duration::from_secs(3600));
        let count = counting_job(&scheduler, "appointments", FIVE_MINUTES);

        assert!(scheduler.start().await);
        wait_for_count(&count, 1).await;

        scheduler.pause().await;
        assert!(!scheduler.is_running());
        set_last_run(
            &scheduler,
            "appointments",
            Some(Utc::now() - chrono::Duration::seconds(600)),
        )
        .await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(scheduler.resume().await);
        wait_for_count(&count, 2).await;
        assert!(!scheduler.resume().await);

        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_rapid_pause_resume_keeps_single_loop() {
        let scheduler = JobScheduler::new(Duration::from_millis(20));
        let count = counting_job(&scheduler, "appointments", Duration::from_secs(3600));

        for _ in 0..5 {
            scheduler.start().await;
            scheduler.pause().await;
        }
        assert!(scheduler.start().await);
        wait_for_count(&count, 1).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        // 间隔一小时，无论有几个循环都只能执行一次；计数也验证了锁与到期检查
        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_pause_during_tick_skips_remaining_jobs() {
        let scheduler = JobScheduler::new(Duration::from_secs(3600));
        let started = Arc::new(AtomicBool::new(false));
        let flag = started.clone();
        scheduler
            .add_job("patients", FIVE_MINUTES, move || {
                let flag = flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(())
                }
            })
            .unwrap();
        let second = counting_job(&scheduler, "appointments", FIVE_MINUTES);

        assert!(scheduler.start().await);
        tokio::time::timeout(Duration::from_secs(5), async {
            while !started.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        scheduler.pause().await;

        tokio::time::sleep(Duration::from_millis(400)).await;
        // 正在执行的任务完成了，同一周期后面的任务没有开始
        assert!(last_run(&scheduler, "patients").await.is_some());
        assert_eq!(second.load(Ordering::SeqCst), 0);

        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_trigger_in_background_unknown_job() {
        let scheduler = JobScheduler::new(Duration::from_secs(60));
        counting_job(&scheduler, "appointments", FIVE_MINUTES);

        assert!(matches!(
            scheduler.trigger_in_background("invoices"),
            Err(CollectorError::UnknownJob { .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_waits_for_background_trigger() {
        let scheduler = JobScheduler::new(Duration::from_secs(3600));
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        scheduler
            .add_job("appointments", FIVE_MINUTES, move || {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        scheduler.trigger_in_background("appointments").unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        scheduler.stop().await;

        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(last_run(&scheduler, "appointments").await.is_some());
    }

    #[tokio::test]
    async fn test_stop_cancels_running_job_and_waits_for_it() {
        let scheduler = JobScheduler::new(Duration::from_secs(3600));
        let token = scheduler.cancellation_token();
        let started = Arc::new(AtomicBool::new(false));
        let cleaned_up = Arc::new(AtomicBool::new(false));
        let (s, c) = (started.clone(), cleaned_up.clone());
        scheduler
            .add_job("appointments", FIVE_MINUTES, move || {
                let (s, c, token) = (s.clone(), c.clone(), token.clone());
                async move {
                    s.store(true, Ordering::SeqCst);
                    token.cancelled().await;
                    // 取消后仍有收尾工作，停止必须等它完成
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    c.store(true, Ordering::SeqCst);
                    Err(CollectorError::Cancelled)
                }
            })
            .unwrap();

        assert!(scheduler.start().await);
        tokio::time::timeout(Duration::from_secs(5), async {
            while !started.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        tokio::time::timeout(Duration::from_secs(5), scheduler.stop())
            .await
            .expect("stop did not return");

        assert!(cleaned_up.load(Ordering::SeqCst));
        assert!(last_run(&scheduler, "appointments").await.is_none());
    }

    #[tokio::test]
    async fn test_stopped_scheduler_rejects_start_and_trigger() {
        let scheduler = JobScheduler::new(Duration::from_secs(3600));
        let count = counting_job(&scheduler, "appointments", FIVE_MINUTES);

        scheduler.stop().await;

        assert!(scheduler.cancellation_token().is_cancelled());
        assert!(!scheduler.start().await);
        assert!(matches!(
            scheduler.trigger_in_background("appointments"),
            Err(CollectorError::Cancelled)
        ));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
