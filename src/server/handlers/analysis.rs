//! 8-K 分析與新聞爬取的即時 API。

use crate::domain::model::{FilingAnalysis, FilingQuery, NewsArticle};
use crate::server::errors::AppError;
use crate::server::extract::ApiJson;
use crate::server::AppState;
use crate::utils::time::today_kst;
use axum::{extract::State, Json};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `POST /analyze-8k` 的請求；未給的欄位使用設定值
#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub max_files: Option<i64>,
    pub days_back: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub ticker: String,
    pub total_filings: usize,
    pub results: Vec<FilingAnalysis>,
    pub total_cost_usd: f64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CrawlRequest {
    pub tickers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub crawl_results: BTreeMap<String, Vec<NewsArticle>>,
}

fn round_cost(cost: f64) -> f64 {
    (cost * 10_000.0).round() / 10_000.0
}

/// `POST /analyze-8k`
pub async fn analyze_8k(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let ticker = req.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::unprocessable("ticker must not be empty"));
    }
    let defaults = &state.config.analysis;
    let max_files = req.max_files.unwrap_or(defaults.default_max_files as i64);
    let days_back = req.days_back.unwrap_or(defaults.default_days_back);
    if max_files <= 0 || days_back <= 0 {
        return Err(AppError::unprocessable("max_files and days_back must be positive"));
    }

    tracing::info!("🔍 Analysis requested: {} (max_files={}, days_back={})", ticker, max_files, days_back);

    let today = today_kst();
    let after = Duration::try_days(days_back)
        .and_then(|span| today.checked_sub_signed(span))
        .ok_or_else(|| AppError::unprocessable("days_back is out of range"))?;
    let query = FilingQuery {
        ticker: ticker.clone(),
        after,
        before: today,
        limit: Some(max_files as usize),
    };
    let docs = state.services.filings.fetch_8k_filings(&query).await?;
    if docs.is_empty() {
        return Err(AppError::not_found(format!(
            "{}의 최근 {}일 간 8-K 공시를 찾을 수 없습니다.",
            ticker, days_back
        )));
    }

    let results = state.services.analyzer.analyze(&docs, today).await;
    let total_cost: f64 = results.iter().map(|r| r.cost_usd).sum();
    tracing::info!(
        "✅ Analysis finished: {} - {} results, ${:.4}",
        ticker,
        results.len(),
        total_cost
    );

    Ok(Json(AnalysisResponse {
        ticker,
        total_filings: docs.len(),
        results,
        total_cost_usd: round_cost(total_cost),
        status: "success".to_string(),
    }))
}

/// `POST /crawl-news`
pub async fn crawl_news(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CrawlRequest>,
) -> Result<Json<CrawlResponse>, AppError> {
    let tickers: Vec<String> = req
        .tickers
        .iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tickers.is_empty() {
        return Err(AppError::unprocessable("tickers must not be empty"));
    }

    tracing::info!("📰 Crawl requested for {} tickers", tickers.len());
    let crawl_results = state.services.news.crawl_many(&tickers).await;
    Ok(Json(CrawlResponse { crawl_results }))
}
