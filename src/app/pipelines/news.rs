use crate::core::{LoadReport, Pipeline};
use crate::domain::model::{NewsArticle, Stock};
use crate::domain::ports::{NewsSource, Repository};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// 個股新聞一筆
#[derive(Debug, Clone, PartialEq)]
pub struct StockArticle {
    pub stock_id: String,
    pub article: NewsArticle,
}

/// 空內文丟掉，同一檔股票內以 URL 去重
pub fn clean_articles(stock_id: &str, articles: Vec<NewsArticle>) -> Vec<StockArticle> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|a| !a.news_content.trim().is_empty())
        .filter(|a| seen.insert(a.news_uri.clone()))
        .map(|article| StockArticle {
            stock_id: stock_id.to_string(),
            article,
        })
        .collect()
}

/// 每檔股票抓 Yahoo 新聞寫入 `news`
pub struct NewsPipeline {
    repository: Arc<dyn Repository>,
    news: Arc<dyn NewsSource>,
}

impl NewsPipeline {
    pub fn new(repository: Arc<dyn Repository>, news: Arc<dyn NewsSource>) -> Self {
        Self { repository, news }
    }
}

#[async_trait]
impl Pipeline for NewsPipeline {
    type Extracted = Vec<Stock>;
    type Transformed = Vec<StockArticle>;

    fn name(&self) -> &'static str {
        "news"
    }

    async fn extract(&self) -> Result<Vec<Stock>> {
        self.repository.list_stocks().await
    }

    async fn transform(&self, stocks: Vec<Stock>) -> Result<Vec<StockArticle>> {
        let tickers: Vec<String> = stocks.into_iter().map(|s| s.stock_id).collect();
        tracing::info!("📰 Crawling news for {} stocks", tickers.len());

        let crawled = self.news.crawl_many(&tickers).await;
        Ok(tickers
            .iter()
            .filter_map(|ticker| crawled.get(ticker).map(|articles| (ticker, articles)))
            .flat_map(|(ticker, articles)| clean_articles(ticker, articles.clone()))
            .collect())
    }

    async fn load(&self, articles: Vec<StockArticle>) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for item in &articles {
            match self.repository.insert_news(&item.stock_id, &item.article).await {
                Ok(_) => report.stored += 1,
                Err(e) => {
                    tracing::error!("❌ {} - failed to store news '{}': {}", item.stock_id, item.article.news_title, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
