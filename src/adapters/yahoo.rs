use crate::adapters::article::extract_article;
use crate::config::NewsConfig;
use crate::domain::model::NewsArticle;
use crate::domain::ports::NewsSource;
use crate::utils::error::{DigestError, Result};
use crate::utils::time::utc_iso_to_kst_string;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
struct NcpResponse {
    #[serde(default)]
    data: NcpData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NcpData {
    #[serde(default)]
    ticker_stream: TickerStream,
}

#[derive(Debug, Default, Deserialize)]
struct TickerStream {
    #[serde(default)]
    stream: Vec<StreamItem>,
}

#[derive(Debug, Deserialize)]
struct StreamItem {
    content: Option<StoryContent>,
    ad: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoryContent {
    title: Option<String>,
    pub_date: Option<String>,
    canonical_url: Option<StoryUrl>,
    click_through_url: Option<StoryUrl>,
}

#[derive(Debug, Clone, Deserialize)]
struct StoryUrl {
    url: Option<String>,
}

/// 新聞串流中的一則報導
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub title: Option<String>,
    pub url: String,
    pub pub_date: Option<String>,
}

impl StoryContent {
    fn into_story(self) -> Option<Story> {
        let url = self
            .canonical_url
            .and_then(|u| u.url)
            .or_else(|| self.click_through_url.and_then(|u| u.url))
            .filter(|u| !u.is_empty())?;
        Some(Story {
            title: self.title,
            url,
            pub_date: self.pub_date,
        })
    }
}

/// Yahoo Finance 新聞爬蟲：先從 NCP 串流取得報導清單，再逐篇下載內文
pub struct YahooNewsClient {
    client: Client,
    base_url: String,
    articles_per_ticker: usize,
    market_symbols: Vec<String>,
    market_articles: usize,
    between_tickers: Duration,
}

impl YahooNewsClient {
    pub fn new(config: &NewsConfig, between_tickers: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.yahoo_base_url.trim_end_matches('/').to_string(),
            articles_per_ticker: config.articles_per_ticker,
            market_symbols: config.market_symbols.clone(),
            market_articles: config.market_articles,
            between_tickers,
        })
    }

    pub async fn fetch_stream(&self, symbols: &[String], count: usize) -> Result<Vec<Story>> {
        let url = format!(
            "{}/xhr/ncp?queryRef=latestNews&serviceKey=ncp_fin",
            self.base_url
        );
        let body = json!({
            "serviceConfig": {
                "snippetCount": count,
                "s": symbols,
            }
        });

        tracing::debug!("Making news stream request for {:?}", symbols);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DigestError::UpstreamError {
                service: "Yahoo Finance".to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: NcpResponse = response.json().await?;
        Ok(parsed
            .data
            .ticker_stream
            .stream
            .into_iter()
            .filter(|item| item.ad.is_none())
            .filter_map(|item| item.content.and_then(StoryContent::into_story))
            .take(count)
            .collect())
    }

    async fn download_article(&self, story: &Story) -> Result<NewsArticle> {
        let response = self.client.get(&story.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::UpstreamError {
                service: "news article".to_string(),
                status: status.as_u16(),
                message: story.url.clone(),
            });
        }
        let html = response.text().await?;
        let article = extract_article(&html);

        let news_date = match story.pub_date.as_deref().map(utc_iso_to_kst_string) {
            Some(Ok(date)) => Some(date),
            Some(Err(e)) => {
                tracing::warn!("⚠️ Unparseable pubDate for {}: {}", story.url, e);
                None
            }
            None => None,
        };

        Ok(NewsArticle {
            news_title: article
                .title
                .or_else(|| story.title.clone())
                .unwrap_or_default(),
            news_uri: story.url.clone(),
            news_content: article.text,
            news_date,
            news_image: article.image,
        })
    }

    /// 單篇失敗只記錄並略過
    async fn download_all(&self, stories: Vec<Story>) -> Vec<NewsArticle> {
        let mut articles = Vec::with_capacity(stories.len());
        for story in stories {
            match self.download_article(&story).await {
                Ok(article) => {
                    tracing::info!("  - 📰 {}", article.news_title);
                    articles.push(article);
                }
                Err(e) => tracing::error!("  - ❌ Article failed ({}): {}", story.url, e),
            }
        }
        articles
    }
}

#[async_trait]
impl NewsSource for YahooNewsClient {
    async fn crawl_ticker(&self, ticker: &str) -> Result<Vec<NewsArticle>> {
        tracing::info!("📰 Crawling news for {}", ticker);
        let stories = self
            .fetch_stream(&[ticker.to_string()], self.articles_per_ticker)
            .await?;
        let articles = self.download_all(stories).await;
        tracing::info!("✅ {} articles collected for {}", articles.len(), ticker);
        Ok(articles)
    }

    async fn crawl_market(&self) -> Result<Vec<NewsArticle>> {
        tracing::info!("📰 Crawling market news for {:?}", self.market_symbols);
        let mut seen = HashSet::new();
        let stories: Vec<Story> = self
            .fetch_stream(&self.market_symbols, self.market_articles)
            .await?
            .into_iter()
            .filter(|s| seen.insert(s.url.clone()))
            .collect();
        Ok(self.download_all(stories).await)
    }

    async fn crawl_many(&self, tickers: &[String]) -> BTreeMap<String, Vec<NewsArticle>> {
        let mut results = BTreeMap::new();
        for (idx, ticker) in tickers.iter().enumerate() {
            if idx > 0 && !self.between_tickers.is_zero() {
                tokio::time::sleep(self.between_tickers).await;
            }
            let articles = self.crawl_ticker(ticker).await.unwrap_or_else(|e| {
                tracing::error!("❌ News crawl failed for {}: {}", ticker, e);
                Vec::new()
            });
            results.insert(ticker.clone(), articles);
        }
        results
    }
}
