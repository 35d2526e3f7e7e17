use crate::config::schedule::JobSchedule;
use crate::core::etl::Job;
use crate::core::LoadReport;
use crate::utils::error::{DigestError, Result};
use crate::utils::time::now_kst;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct ScheduledJob {
    job: Arc<dyn Job>,
    schedule: JobSchedule,
    running: Arc<AtomicBool>,
}

/// 離開作用域就清除執行中旗標 (包含 panic 與 future 被丟棄)
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ScheduledJob {
    /// 同一個工作不重疊執行；上一輪還沒結束就略過這次
    async fn run_guarded(&self) -> Result<LoadReport> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(DigestError::processing(format!(
                "job '{}' is already running",
                self.job.name()
            )));
        }
        let _guard = RunningGuard(self.running.clone());
        self.job.run().await
    }
}

/// `GET /jobs` 與 `list-jobs` 的輸出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub name: String,
    pub schedule: String,
    pub running: bool,
}

/// 以 tokio task 驅動的簡易排程器，時間以 KST 計算
#[derive(Clone, Default)]
pub struct Scheduler {
    jobs: Vec<Arc<ScheduledJob>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job: Arc<dyn Job>, schedule: JobSchedule) {
        tracing::debug!("Registered job '{}' ({})", job.name(), schedule);
        self.jobs.push(Arc::new(ScheduledJob {
            job,
            schedule,
            running: Arc::new(AtomicBool::new(false)),
        }));
    }

    pub fn jobs(&self) -> Vec<JobInfo> {
        self.jobs
            .iter()
            .map(|j| JobInfo {
                name: j.job.name().to_string(),
                schedule: j.schedule.to_string(),
                running: j.running.load(Ordering::SeqCst),
            })
            .collect()
    }

    fn find(&self, name: &str) -> Result<Arc<ScheduledJob>> {
        self.jobs
            .iter()
            .find(|j| j.job.name() == name)
            .cloned()
            .ok_or_else(|| DigestError::UnknownJob {
                name: name.to_string(),
            })
    }

    /// 立即執行並等待結果
    pub async fn run_now(&self, name: &str) -> Result<LoadReport> {
        self.find(name)?.run_guarded().await
    }

    /// 背景執行，立即返回
    pub fn trigger(&self, name: &str) -> Result<()> {
        let scheduled = self.find(name)?;
        tokio::spawn(async move {
            if let Err(e) = scheduled.run_guarded().await {
                tracing::error!("❌ Triggered job '{}' failed: {}", scheduled.job.name(), e);
            }
        });
        Ok(())
    }

    /// 每個啟用的工作一個 task；`shutdown` 取消時全部結束
    pub fn start(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        self.jobs
            .iter()
            .filter(|j| j.schedule.is_enabled())
            .map(|scheduled| {
                let scheduled = scheduled.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move { drive(scheduled, shutdown).await })
            })
            .collect()
    }
}

async fn run_logged(scheduled: &ScheduledJob) {
    match scheduled.run_guarded().await {
        Ok(_) => {}
        Err(e) => tracing::error!("❌ Scheduled job '{}' failed: {}", scheduled.job.name(), e),
    }
}

async fn drive(scheduled: Arc<ScheduledJob>, shutdown: CancellationToken) {
    let name = scheduled.job.name();

    if scheduled.schedule == JobSchedule::OnStartup {
        tracing::info!("⏰ Running startup job '{}'", name);
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = run_logged(&scheduled) => {}
        }
        return;
    }

    loop {
        let now = now_kst();
        let Some(next) = scheduled.schedule.next_fire_after(now) else {
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!("⏰ Job '{}' next run at {}", name, next.format("%Y-%m-%d %H:%M:%S %:z"));

        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("🛑 Scheduler stopping job '{}'", name);
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        // 執行中的工作不阻塞下一輪計時
        let runner = scheduled.clone();
        tokio::spawn(async move { run_logged(&runner).await });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct SlowJob {
        runs: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl Job for SlowJob {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn run(&self) -> Result<LoadReport> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(LoadReport::default())
        }
    }

    fn slow(delay: Duration) -> Arc<SlowJob> {
        Arc::new(SlowJob {
            runs: AtomicUsize::new(0),
            delay,
        })
    }

    #[tokio::test]
    async fn test_run_now_and_unknown_job() {
        let job = slow(Duration::ZERO);
        let mut scheduler = Scheduler::new();
        scheduler.register(job.clone(), JobSchedule::Disabled);

        scheduler.run_now("slow").await.unwrap();
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
        assert!(matches!(
            scheduler.run_now("missing").await,
            Err(DigestError::UnknownJob { .. })
        ));
    }

    #[tokio::test]
    async fn test_overlapping_runs_are_rejected() {
        let job = slow(Duration::from_millis(200));
        let mut scheduler = Scheduler::new();
        scheduler.register(job.clone(), JobSchedule::Disabled);

        scheduler.trigger("slow").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.jobs()[0].running);
        assert!(scheduler.run_now("slow").await.is_err());
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }

    /// 第一次執行 panic，之後正常
    struct PanicOnceJob {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Job for PanicOnceJob {
        fn name(&self) -> &'static str {
            "panic-once"
        }

        async fn run(&self) -> Result<LoadReport> {
            if self.runs.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("job blew up");
            }
            Ok(LoadReport::default())
        }
    }

    #[tokio::test]
    async fn test_panicked_job_can_run_again() {
        let job = Arc::new(PanicOnceJob {
            runs: AtomicUsize::new(0),
        });
        let mut scheduler = Scheduler::new();
        scheduler.register(job.clone(), JobSchedule::Disabled);

        scheduler.trigger("panic-once").unwrap();
        for _ in 0..50 {
            if job.runs.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!scheduler.jobs()[0].running);
        scheduler.run_now("panic-once").await.unwrap();
        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropped_run_releases_job() {
        let job = slow(Duration::from_secs(5));
        let mut scheduler = Scheduler::new();
        scheduler.register(job.clone(), JobSchedule::Disabled);

        let cancelled = tokio::time::timeout(Duration::from_millis(50), scheduler.run_now("slow")).await;
        assert!(cancelled.is_err());
        assert!(!scheduler.jobs()[0].running);

        // 沒被當成重疊執行擋下，而是真的開始執行
        let second = tokio::time::timeout(Duration::from_millis(50), scheduler.run_now("slow")).await;
        assert!(second.is_err());
        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_interval_schedule_fires_until_cancelled() {
        let job = slow(Duration::ZERO);
        let mut scheduler = Scheduler::new();
        scheduler.register(job.clone(), JobSchedule::Every(Duration::from_millis(20)));
        scheduler.register(slow(Duration::ZERO), JobSchedule::Disabled);

        let shutdown = CancellationToken::new();
        let handles = scheduler.start(shutdown.clone());
        assert_eq!(handles.len(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(job.runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_startup_job_runs_once() {
        let job = slow(Duration::ZERO);
        let mut scheduler = Scheduler::new();
        scheduler.register(job.clone(), JobSchedule::OnStartup);

        let handles = scheduler.start(CancellationToken::new());
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }
}
