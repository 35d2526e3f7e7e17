pub mod pipelines;

use crate::adapters::{EdgarClient, LocalStorage, MySqlRepository, OpenAiClient, YahooNewsClient};
use crate::analysis::{AnalyzerSettings, FilingAnalyzer};
use crate::config::AppConfig;
use crate::core::{EtlEngine, Scheduler};
use crate::domain::ports::{FilingSource, LlmClient, NewsSource, Repository};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use pipelines::{
    DisclosurePipeline, DisclosureWindow, MainNewsPipeline, NewsPipeline, StockSummaryPipeline,
    SummarySettings, TotalSummaryPipeline,
};
use std::sync::Arc;

/// 各 port 的實作，HTTP 與排程共用
#[derive(Clone)]
pub struct Services {
    pub repository: Arc<dyn Repository>,
    pub filings: Arc<dyn FilingSource>,
    pub news: Arc<dyn NewsSource>,
    pub llm: Arc<dyn LlmClient>,
    pub analyzer: Arc<FilingAnalyzer>,
}

impl Services {
    pub fn new(
        config: &AppConfig,
        repository: Arc<dyn Repository>,
        filings: Arc<dyn FilingSource>,
        news: Arc<dyn NewsSource>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let settings = AnalyzerSettings::from_config(&config.analysis, &config.openai, &config.pacing);
        let analyzer = Arc::new(FilingAnalyzer::new(llm.clone(), settings));
        Self {
            repository,
            filings,
            news,
            llm,
            analyzer,
        }
    }

    /// 連線 MySQL 並建立 SEC / Yahoo / OpenAI 客戶端
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let repository = MySqlRepository::connect(config.database_url()?, &config.database).await?;
        Self::with_repository(config, Arc::new(repository))
    }

    pub fn with_repository(config: &AppConfig, repository: Arc<dyn Repository>) -> Result<Self> {
        let storage = LocalStorage::new(config.sec.cache_dir.clone());
        let filings = EdgarClient::new(&config.sec, config.pacing.sec_request_delay(), storage)?;
        let news = YahooNewsClient::new(&config.news, config.pacing.between_tickers())?;
        let llm = OpenAiClient::new(&config.openai)?;

        Ok(Self::new(
            config,
            repository,
            Arc::new(filings),
            Arc::new(news),
            Arc::new(llm),
        ))
    }
}

/// 依設定註冊所有排程工作
pub fn build_scheduler(config: &AppConfig, services: &Services, monitor: Arc<SystemMonitor>) -> Scheduler {
    let summary_settings = SummarySettings::from_config(&config.analysis, &config.openai, &config.pacing);
    let schedule = &config.schedule;
    let mut scheduler = Scheduler::new();

    for (window, job_schedule) in [
        (DisclosureWindow::Daily, schedule.disclosure),
        (DisclosureWindow::Backfill, schedule.disclosure_backfill),
    ] {
        let pipeline = DisclosurePipeline::new(
            services.repository.clone(),
            services.filings.clone(),
            services.analyzer.clone(),
            window,
            config.analysis.job_max_files,
        );
        scheduler.register(
            Arc::new(EtlEngine::with_monitor(pipeline, monitor.clone())),
            job_schedule,
        );
    }

    scheduler.register(
        Arc::new(EtlEngine::with_monitor(
            MainNewsPipeline::new(services.repository.clone(), services.news.clone()),
            monitor.clone(),
        )),
        schedule.main_news,
    );
    scheduler.register(
        Arc::new(EtlEngine::with_monitor(
            NewsPipeline::new(services.repository.clone(), services.news.clone()),
            monitor.clone(),
        )),
        schedule.news,
    );
    scheduler.register(
        Arc::new(EtlEngine::with_monitor(
            StockSummaryPipeline::new(services.repository.clone(), services.llm.clone(), summary_settings.clone()),
            monitor.clone(),
        )),
        schedule.stock_summary,
    );
    scheduler.register(
        Arc::new(EtlEngine::with_monitor(
            TotalSummaryPipeline::new(services.repository.clone(), services.llm.clone(), summary_settings),
            monitor,
        )),
        schedule.total_summary,
    );

    scheduler
}
