use crate::domain::model::{
    FilingDocument, FilingQuery, HoldingMember, InvestmentType, LoadReport, NewDisclosure,
    NewInvestmentComment, NewNotification, NewSummary, NewsArticle, Stock, StockNews,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// 8-K 公告來源
#[async_trait]
pub trait FilingSource: Send + Sync {
    async fn fetch_8k_filings(&self, query: &FilingQuery) -> Result<Vec<FilingDocument>>;
}

/// 新聞來源
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// 個股新聞；單篇失敗只略過該篇
    async fn crawl_ticker(&self, ticker: &str) -> Result<Vec<NewsArticle>>;
    /// 大盤新聞
    async fn crawl_market(&self) -> Result<Vec<NewsArticle>>;

    /// 逐檔抓取；失敗的 ticker 記錄錯誤並回傳空清單
    async fn crawl_many(&self, tickers: &[String]) -> BTreeMap<String, Vec<NewsArticle>> {
        let mut results = BTreeMap::new();
        for ticker in tickers {
            let articles = self.crawl_ticker(ticker).await.unwrap_or_else(|e| {
                tracing::error!("❌ News crawl failed for {}: {}", ticker, e);
                Vec::new()
            });
            results.insert(ticker.clone(), articles);
        }
        results
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletion {
    pub content: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion>;
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn list_stocks(&self) -> Result<Vec<Stock>>;
    async fn insert_disclosure(&self, disclosure: &NewDisclosure) -> Result<u64>;
    async fn insert_news(&self, stock_id: &str, article: &NewsArticle) -> Result<u64>;
    async fn insert_main_news(&self, article: &NewsArticle) -> Result<u64>;

    /// `created_at` 落在 `[start, end)` 的新聞
    async fn news_created_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<StockNews>>;
    async fn insert_summary(&self, summary: &NewSummary) -> Result<u64>;
    async fn list_investment_types(&self) -> Result<Vec<InvestmentType>>;
    async fn insert_investment_comment(&self, comment: &NewInvestmentComment) -> Result<u64>;
    async fn holding_members(&self, stock_id: &str) -> Result<Vec<HoldingMember>>;
    async fn insert_snapshot(
        &self,
        member_id: i64,
        comment_id: u64,
        created_at: NaiveDateTime,
    ) -> Result<u64>;

    async fn list_member_ids(&self) -> Result<Vec<i64>>;
    /// 會員在 `[start, end)` 內 snapshot 所指向的投資傾向評論內容
    async fn snapshot_comments_between(
        &self,
        member_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<String>>;
    async fn insert_total_summary(
        &self,
        member_id: i64,
        content: &str,
        created_at: NaiveDateTime,
    ) -> Result<u64>;
    async fn insert_notification(&self, notification: &NewNotification) -> Result<u64>;
}

/// 階段輸出的筆數，供引擎記錄
pub trait StageData {
    fn record_count(&self) -> usize;
}

impl<T> StageData for Vec<T> {
    fn record_count(&self) -> usize {
        self.len()
    }
}

/// ETL 三階段，各階段輸出型別由實作決定
#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: StageData + Send;
    type Transformed: StageData + Send;

    fn name(&self) -> &'static str;
    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    async fn load(&self, data: Self::Transformed) -> Result<LoadReport>;
}
