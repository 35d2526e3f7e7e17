use crate::analysis::analyzer::{FilingAnalyzer, NO_FILINGS_TITLE};
use crate::core::{LoadReport, Pipeline};
use crate::domain::model::{FilingQuery, NewDisclosure, Stock};
use crate::domain::ports::{FilingSource, Repository};
use crate::utils::error::Result;
use crate::utils::time::{now_kst_naive, today_kst};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::sync::Arc;

/// 公告搜尋區間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisclosureWindow {
    /// 只看昨天
    Daily,
    /// 一年前到前天，用於初次建檔
    Backfill,
}

impl DisclosureWindow {
    /// 回傳 (after, before, 寫入的 disclosure_date)
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate, NaiveDate) {
        match self {
            Self::Daily => {
                let yesterday = today - Days::new(1);
                (yesterday, yesterday, yesterday)
            }
            Self::Backfill => {
                let end = today - Days::new(2);
                (today - Days::new(365), end, end)
            }
        }
    }
}

/// 每檔股票抓 8-K、交給 LLM 分析後寫入 `disclosure`
pub struct DisclosurePipeline {
    repository: Arc<dyn Repository>,
    filings: Arc<dyn FilingSource>,
    analyzer: Arc<FilingAnalyzer>,
    window: DisclosureWindow,
    max_files: usize,
}

impl DisclosurePipeline {
    pub fn new(
        repository: Arc<dyn Repository>,
        filings: Arc<dyn FilingSource>,
        analyzer: Arc<FilingAnalyzer>,
        window: DisclosureWindow,
        max_files: usize,
    ) -> Self {
        Self {
            repository,
            filings,
            analyzer,
            window,
            max_files,
        }
    }

    async fn analyse_stock(&self, stock: &Stock, today: NaiveDate) -> Result<Vec<NewDisclosure>> {
        let (after, before, disclosure_date) = self.window.range(today);
        tracing::info!("📌 Analysing {} for {} ~ {}", stock.stock_id, after, before);

        let docs = self
            .filings
            .fetch_8k_filings(&FilingQuery {
                ticker: stock.stock_id.clone(),
                after,
                before,
                limit: Some(self.max_files),
            })
            .await?;

        if docs.is_empty() {
            tracing::info!("{} - no filings to analyse", stock.stock_id);
            return Ok(Vec::new());
        }

        let created_at = now_kst_naive();
        Ok(self
            .analyzer
            .analyze(&docs, disclosure_date)
            .await
            .into_iter()
            .filter(|result| result.title != NO_FILINGS_TITLE)
            .map(|result| NewDisclosure {
                stock_id: stock.stock_id.clone(),
                disclosure_date,
                title: result.title,
                summary: result.narrative,
                created_at,
            })
            .collect())
    }
}

#[async_trait]
impl Pipeline for DisclosurePipeline {
    type Extracted = Vec<Stock>;
    type Transformed = Vec<NewDisclosure>;

    fn name(&self) -> &'static str {
        match self.window {
            DisclosureWindow::Daily => "disclosure",
            DisclosureWindow::Backfill => "disclosure-backfill",
        }
    }

    async fn extract(&self) -> Result<Vec<Stock>> {
        self.repository.list_stocks().await
    }

    async fn transform(&self, stocks: Vec<Stock>) -> Result<Vec<NewDisclosure>> {
        let today = today_kst();
        let mut disclosures = Vec::new();
        for stock in &stocks {
            match self.analyse_stock(stock, today).await {
                Ok(mut rows) => disclosures.append(&mut rows),
                Err(e) => tracing::error!("❌ {} - disclosure analysis failed: {}", stock.stock_id, e),
            }
        }
        Ok(disclosures)
    }

    async fn load(&self, disclosures: Vec<NewDisclosure>) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for disclosure in &disclosures {
            match self.repository.insert_disclosure(disclosure).await {
                Ok(_) => report.stored += 1,
                Err(e) => {
                    tracing::error!("❌ {} - failed to store disclosure: {}", disclosure.stock_id, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
