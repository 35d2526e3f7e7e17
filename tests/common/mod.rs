#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sec_digest::config::{AppConfig, PacingConfig};
use sec_digest::domain::model::{
    FilingDocument, FilingQuery, HoldingMember, InvestmentType, NewDisclosure, NewInvestmentComment,
    NewNotification, NewSummary, NewsArticle, Stock, StockNews,
};
use sec_digest::domain::ports::{ChatCompletion, ChatRequest, FilingSource, LlmClient, NewsSource, Repository};
use sec_digest::utils::error::{DigestError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// repository 與 LLM 共用的呼叫紀錄，用來檢查交錯順序
pub type EventLog = Arc<Mutex<Vec<(String, Instant)>>>;

fn record(events: &Option<EventLog>, event: String) {
    if let Some(events) = events {
        events.lock().unwrap().push((event, Instant::now()));
    }
}

pub fn event_names(events: &EventLog) -> Vec<String> {
    events.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
}

/// 所有外部 URL 指向 mock server、間隔全為 0 的設定
pub fn test_config(base_url: &str, cache_dir: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.sec.company_name = "Acme".to_string();
    config.sec.email_address = "ops@acme.io".to_string();
    config.sec.www_base_url = base_url.to_string();
    config.sec.data_base_url = base_url.to_string();
    config.sec.cache_dir = cache_dir.to_string();
    config.sec.min_document_chars = 100;
    config.news.yahoo_base_url = base_url.to_string();
    config.news.articles_per_ticker = 3;
    config.news.market_articles = 3;
    config.openai.base_url = base_url.to_string();
    config.openai.api_key = Some("test-key".to_string());
    config.pacing = PacingConfig::none();
    config
}

pub fn article(title: &str, uri: &str, content: &str) -> NewsArticle {
    NewsArticle {
        news_title: title.to_string(),
        news_uri: uri.to_string(),
        news_content: content.to_string(),
        news_date: Some("2025-07-06 09:00:00.000000".to_string()),
        news_image: None,
    }
}

/// 夠長的 8-K 內文，含 Item 2.02 區塊
pub fn filing_text(accession: &str) -> String {
    format!(
        "<SEC-DOCUMENT>{accession}.txt\nFILED AS OF DATE: 20250705\n<html><body>\
         <p>Item 2.02 Results of Operations and Financial Condition.</p>\
         <p>On July 5, 2025 the Company announced revenue of $1.2 billion, an increase of 12% \
         compared with the prior year. Net income rose to $210 million and the board declared a dividend.</p>\
         <p>Item 9.01 Financial Statements and Exhibits.</p><p>Exhibit 99.1 Press release.</p>\
         <p>SIGNATURE</p></body></html>"
    )
}

#[derive(Default)]
pub struct RepoState {
    pub stocks: Vec<Stock>,
    pub disclosures: Vec<NewDisclosure>,
    pub news: Vec<(String, NewsArticle)>,
    pub main_news: Vec<NewsArticle>,
    pub todays_news: Vec<StockNews>,
    pub summaries: Vec<NewSummary>,
    pub investment_types: Vec<InvestmentType>,
    pub comments: Vec<NewInvestmentComment>,
    pub holders: HashMap<String, Vec<HoldingMember>>,
    pub snapshots: Vec<(i64, u64)>,
    pub member_comments: HashMap<i64, Vec<String>>,
    pub total_summaries: Vec<(i64, String)>,
    pub notifications: Vec<NewNotification>,
    pub unavailable: bool,
}

/// 記憶體內的 Repository，自動遞增 id 從 1 開始
#[derive(Default)]
pub struct InMemoryRepository {
    pub state: Mutex<RepoState>,
    events: Option<EventLog>,
}

impl InMemoryRepository {
    pub fn with_events(mut self, events: &EventLog) -> Self {
        self.events = Some(events.clone());
        self
    }

    pub fn with_stocks(ids: &[&str]) -> Self {
        let repo = Self::default();
        repo.state.lock().unwrap().stocks = ids
            .iter()
            .map(|id| Stock {
                stock_id: id.to_string(),
                stock_name: Some(format!("{id} Inc.")),
            })
            .collect();
        repo
    }

    fn check(&self) -> Result<()> {
        if self.state.lock().unwrap().unavailable {
            return Err(DigestError::processing("database unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn list_stocks(&self) -> Result<Vec<Stock>> {
        self.check()?;
        Ok(self.state.lock().unwrap().stocks.clone())
    }

    async fn insert_disclosure(&self, disclosure: &NewDisclosure) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.disclosures.push(disclosure.clone());
        Ok(state.disclosures.len() as u64)
    }

    async fn insert_news(&self, stock_id: &str, article: &NewsArticle) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.news.push((stock_id.to_string(), article.clone()));
        Ok(state.news.len() as u64)
    }

    async fn insert_main_news(&self, article: &NewsArticle) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.main_news.push(article.clone());
        Ok(state.main_news.len() as u64)
    }

    async fn news_created_between(&self, _start: NaiveDateTime, _end: NaiveDateTime) -> Result<Vec<StockNews>> {
        self.check()?;
        Ok(self.state.lock().unwrap().todays_news.clone())
    }

    async fn insert_summary(&self, summary: &NewSummary) -> Result<u64> {
        record(&self.events, format!("insert summary {}", summary.stock_id));
        let mut state = self.state.lock().unwrap();
        state.summaries.push(summary.clone());
        Ok(state.summaries.len() as u64)
    }

    async fn list_investment_types(&self) -> Result<Vec<InvestmentType>> {
        Ok(self.state.lock().unwrap().investment_types.clone())
    }

    async fn insert_investment_comment(&self, comment: &NewInvestmentComment) -> Result<u64> {
        record(&self.events, format!("insert comment {}", comment.summary_id));
        let mut state = self.state.lock().unwrap();
        state.comments.push(comment.clone());
        Ok(state.comments.len() as u64)
    }

    async fn holding_members(&self, stock_id: &str) -> Result<Vec<HoldingMember>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .holders
            .get(stock_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_snapshot(&self, member_id: i64, comment_id: u64, _created_at: NaiveDateTime) -> Result<u64> {
        record(&self.events, format!("insert snapshot {}", member_id));
        let mut state = self.state.lock().unwrap();
        state.snapshots.push((member_id, comment_id));
        Ok(state.snapshots.len() as u64)
    }

    async fn list_member_ids(&self) -> Result<Vec<i64>> {
        self.check()?;
        let mut ids: Vec<i64> = self.state.lock().unwrap().member_comments.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    async fn snapshot_comments_between(
        &self,
        member_id: i64,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
    ) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .member_comments
            .get(&member_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_total_summary(&self, member_id: i64, content: &str, _created_at: NaiveDateTime) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.total_summaries.push((member_id, content.to_string()));
        Ok(state.total_summaries.len() as u64)
    }

    async fn insert_notification(&self, notification: &NewNotification) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.notifications.push(notification.clone());
        Ok(state.notifications.len() as u64)
    }
}

type Responder = Box<dyn Fn(&ChatRequest) -> Result<String> + Send + Sync>;

/// 依 prompt 內容回覆的假 LLM，並記錄每個請求
pub struct MockLlm {
    respond: Responder,
    pub requests: Mutex<Vec<ChatRequest>>,
    events: Option<EventLog>,
}

impl MockLlm {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
            events: None,
        }
    }

    pub fn with_events(mut self, events: &EventLog) -> Self {
        self.events = Some(events.clone());
        self
    }

    /// 依 prompt 種類回覆：8-K 分析回 JSON，其餘回固定文字
    pub fn digest() -> Self {
        Self::new(|request| {
            let prompt = &request.prompt;
            Ok(if prompt.contains("SEC Form 8-K") {
                r#"```json
{"title": "2분기 실적 발표", "narrative": "회사는 매출이 12% 증가했다고 밝혔습니다.", "filing_date": "2025-07-05"}
```"#
                    .to_string()
            } else if prompt.contains("investment profile") {
                "  장기적인 관점에서 접근하시길 권합니다.  ".to_string()
            } else if prompt.contains("key takeaways") {
                "📈 실적 호조\n매출이 증가했습니다.".to_string()
            } else {
                "### 실적\n매출이 증가했습니다.".to_string()
            })
        })
    }

    pub fn failing(status: u16) -> Self {
        Self::new(move |_| Err(DigestError::llm(Some(status), "mock failure")))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|r| r.prompt.clone()).collect()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        self.requests.lock().unwrap().push(request.clone());
        let kind = if request.prompt.contains("investment profile") {
            "commentary"
        } else {
            "summary"
        };
        record(&self.events, format!("llm {}", kind));
        let content = (self.respond)(request)?;
        Ok(ChatCompletion {
            content,
            prompt_tokens: Some(1000),
            completion_tokens: Some(200),
        })
    }
}

/// 固定回傳的 8-K 來源，記錄收到的查詢
#[derive(Default)]
pub struct StaticFilings {
    pub docs: HashMap<String, Vec<FilingDocument>>,
    pub deny: bool,
    pub queries: Mutex<Vec<FilingQuery>>,
}

impl StaticFilings {
    pub fn with(ticker: &str, docs: Vec<FilingDocument>) -> Self {
        let mut filings = Self::default();
        filings.docs.insert(ticker.to_string(), docs);
        filings
    }
}

#[async_trait]
impl FilingSource for StaticFilings {
    async fn fetch_8k_filings(&self, query: &FilingQuery) -> Result<Vec<FilingDocument>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.deny {
            return Err(DigestError::SecAccessDenied {
                url: "https://www.sec.gov/files/company_tickers.json".to_string(),
            });
        }
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(self
            .docs
            .get(&query.ticker)
            .map(|docs| docs.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// 固定回傳的新聞來源；`failing` 內的 ticker 回傳錯誤
#[derive(Default)]
pub struct StaticNews {
    pub by_ticker: HashMap<String, Vec<NewsArticle>>,
    pub market: Vec<NewsArticle>,
    pub failing: Vec<String>,
}

#[async_trait]
impl NewsSource for StaticNews {
    async fn crawl_ticker(&self, ticker: &str) -> Result<Vec<NewsArticle>> {
        if self.failing.iter().any(|t| t == ticker) {
            return Err(DigestError::UpstreamError {
                service: "Yahoo Finance".to_string(),
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(self.by_ticker.get(ticker).cloned().unwrap_or_default())
    }

    async fn crawl_market(&self) -> Result<Vec<NewsArticle>> {
        Ok(self.market.clone())
    }
}
