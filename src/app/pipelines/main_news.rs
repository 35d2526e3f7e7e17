use crate::core::{LoadReport, Pipeline};
use crate::domain::model::NewsArticle;
use crate::domain::ports::{NewsSource, Repository};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// 大盤新聞寫入 `main_news`
pub struct MainNewsPipeline {
    repository: Arc<dyn Repository>,
    news: Arc<dyn NewsSource>,
}

impl MainNewsPipeline {
    pub fn new(repository: Arc<dyn Repository>, news: Arc<dyn NewsSource>) -> Self {
        Self { repository, news }
    }
}

#[async_trait]
impl Pipeline for MainNewsPipeline {
    type Extracted = Vec<NewsArticle>;
    type Transformed = Vec<NewsArticle>;

    fn name(&self) -> &'static str {
        "main-news"
    }

    async fn extract(&self) -> Result<Vec<NewsArticle>> {
        self.news.crawl_market().await
    }

    async fn transform(&self, articles: Vec<NewsArticle>) -> Result<Vec<NewsArticle>> {
        Ok(articles
            .into_iter()
            .filter(|a| !a.news_content.trim().is_empty())
            .collect())
    }

    async fn load(&self, articles: Vec<NewsArticle>) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for article in &articles {
            match self.repository.insert_main_news(article).await {
                Ok(_) => report.stored += 1,
                Err(e) => {
                    tracing::error!("❌ Failed to store main news '{}': {}", article.news_title, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
