mod common;

use chrono::Timelike;
use common::{article, InMemoryRepository, StaticNews};
use sec_digest::app::pipelines::MainNewsPipeline;
use sec_digest::config::schedule::JobSchedule;
use sec_digest::core::{EtlEngine, Scheduler};
use sec_digest::utils::time::now_kst;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn main_news_scheduler(repo: Arc<InMemoryRepository>, schedule: JobSchedule) -> Scheduler {
    let news = StaticNews {
        market: vec![article("Market up", "https://news/m1", "Indexes rose")],
        ..Default::default()
    };
    let mut scheduler = Scheduler::new();
    scheduler.register(
        Arc::new(EtlEngine::new(MainNewsPipeline::new(repo, Arc::new(news)))),
        schedule,
    );
    scheduler
}

fn stored(repo: &InMemoryRepository) -> usize {
    repo.state.lock().unwrap().main_news.len()
}

#[tokio::test]
async fn test_interval_job_runs_until_shutdown() {
    let repo = Arc::new(InMemoryRepository::default());
    let scheduler = main_news_scheduler(repo.clone(), JobSchedule::Every(Duration::from_millis(30)));

    let shutdown = CancellationToken::new();
    let handles = scheduler.start(shutdown.clone());
    assert_eq!(handles.len(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.cancel();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler task did not stop")
            .unwrap();
    }

    // 取消前至少跑了兩輪，取消後不再新增
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_cancel = stored(&repo);
    assert!(after_cancel >= 2, "ran {after_cancel} times");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(stored(&repo), after_cancel);
    assert!(!scheduler.jobs()[0].running);
}

#[tokio::test]
async fn test_daily_job_waits_and_stops_on_shutdown() {
    let repo = Arc::new(InMemoryRepository::default());
    // 現在的前一分鐘 → 下一次觸發在將近 24 小時後
    let earlier = now_kst() - chrono::Duration::minutes(1);
    let schedule = JobSchedule::daily(earlier.hour(), earlier.minute());
    let scheduler = main_news_scheduler(repo.clone(), schedule);

    let shutdown = CancellationToken::new();
    let handles = scheduler.start(shutdown.clone());
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler task did not stop")
            .unwrap();
    }

    assert_eq!(stored(&repo), 0);
}

#[tokio::test]
async fn test_disabled_job_is_not_started_but_runs_on_demand() {
    let repo = Arc::new(InMemoryRepository::default());
    let scheduler = main_news_scheduler(repo.clone(), JobSchedule::Disabled);

    assert!(scheduler.start(CancellationToken::new()).is_empty());
    let report = scheduler.run_now("main-news").await.unwrap();
    assert_eq!(report.stored, 1);
    assert_eq!(stored(&repo), 1);
}
