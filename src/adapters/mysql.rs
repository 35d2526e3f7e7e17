use crate::config::DatabaseConfig;
use crate::domain::model::{
    HoldingMember, InvestmentType, NewDisclosure, NewInvestmentComment, NewNotification, NewSummary,
    NewsArticle, Stock, StockNews,
};
use crate::domain::ports::Repository;
use crate::utils::error::{DigestError, Result};
use crate::utils::time::now_kst_naive;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::path::Path;

/// MySQL 實作，所有查詢都用參數綁定
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;
        tracing::info!("🗄️ Connected to MySQL (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    /// 不立即連線，第一次查詢時才建立連線
    pub fn connect_lazy(url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// 依 `;` 切開 SQL 檔逐句執行
    pub async fn run_migrations(&self, path: &Path) -> Result<usize> {
        if !path.exists() {
            return Err(DigestError::MissingConfigError {
                field: format!("migration file {}", path.display()),
            });
        }

        let sql = tokio::fs::read_to_string(path).await?;
        let statements = sql
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("🛠️ Running {} migration statements...", statements.len());

        for stmt in &statements {
            tracing::debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&self.pool).await?;
        }

        Ok(statements.len())
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_stocks(&self) -> Result<Vec<Stock>> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT stock_id, stock_name FROM stock ORDER BY stock_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .filter(|(id, _)| !id.trim().is_empty())
            .map(|(stock_id, stock_name)| Stock { stock_id, stock_name })
            .collect())
    }

    async fn insert_disclosure(&self, disclosure: &NewDisclosure) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO disclosure \
             (disclosure_date, created_at, updated_at, disclosure_summary, disclosure_title, stock_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(disclosure.disclosure_date)
        .bind(disclosure.created_at)
        .bind(disclosure.created_at)
        .bind(&disclosure.summary)
        .bind(&disclosure.title)
        .bind(&disclosure.stock_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn insert_news(&self, stock_id: &str, article: &NewsArticle) -> Result<u64> {
        let now = now_kst_naive();
        let result = sqlx::query(
            "INSERT INTO news \
             (created_at, updated_at, news_content, news_date, news_image, news_title, news_uri, stock_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(now)
        .bind(now)
        .bind(&article.news_content)
        .bind(&article.news_date)
        .bind(&article.news_image)
        .bind(&article.news_title)
        .bind(&article.news_uri)
        .bind(stock_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn insert_main_news(&self, article: &NewsArticle) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO main_news (news_content, news_title, news_uri, news_date) VALUES (?, ?, ?, ?)",
        )
        .bind(&article.news_content)
        .bind(&article.news_title)
        .bind(&article.news_uri)
        .bind(&article.news_date)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn news_created_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<StockNews>> {
        let rows: Vec<(Option<String>, Option<String>, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT n.stock_id, s.stock_name, n.news_content, n.news_image \
             FROM news n LEFT JOIN stock s ON n.stock_id = s.stock_id \
             WHERE n.created_at >= ? AND n.created_at < ? \
             ORDER BY n.id",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(stock_id, stock_name, news_content, news_image)| StockNews {
                stock_id,
                stock_name,
                news_content,
                news_image,
            })
            .collect())
    }

    async fn insert_summary(&self, summary: &NewSummary) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO summary (created_at, updated_at, news_content, news_image, stock_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(summary.created_at)
        .bind(summary.created_at)
        .bind(&summary.content)
        .bind(&summary.image_url)
        .bind(&summary.stock_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn list_investment_types(&self) -> Result<Vec<InvestmentType>> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, investment_name FROM investment_type ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| InvestmentType { id, name })
            .collect())
    }

    async fn insert_investment_comment(&self, comment: &NewInvestmentComment) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO investment_type_news_comment \
             (summary_id, investment_id, investment_type_news_content, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(comment.summary_id)
        .bind(comment.investment_type_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn holding_members(&self, stock_id: &str) -> Result<Vec<HoldingMember>> {
        let rows: Vec<(i64, Option<i64>)> = sqlx::query_as(
            "SELECT m.id, it.id \
             FROM member m \
             JOIN member_stock ms ON m.id = ms.member_id \
             LEFT JOIN investment_type it ON m.investment_type_id = it.id \
             WHERE ms.stock_id = ?",
        )
        .bind(stock_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(member_id, investment_type_id)| HoldingMember {
                member_id,
                investment_type_id,
            })
            .collect())
    }

    async fn insert_snapshot(
        &self,
        member_id: i64,
        comment_id: u64,
        created_at: NaiveDateTime,
    ) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO member_stock_snapshot \
             (created_at, updated_at, member_id, investment_type_news_comment_id) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(created_at)
        .bind(created_at)
        .bind(member_id)
        .bind(comment_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn list_member_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM member ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn snapshot_comments_between(
        &self,
        member_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<String>> {
        let rows: Vec<Option<String>> = sqlx::query_scalar(
            "SELECT c.investment_type_news_content \
             FROM member_stock_snapshot s \
             JOIN investment_type_news_comment c ON s.investment_type_news_comment_id = c.id \
             WHERE s.member_id = ? AND s.created_at >= ? AND s.created_at < ? \
             ORDER BY s.id",
        )
        .bind(member_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().flatten().collect())
    }

    async fn insert_total_summary(
        &self,
        member_id: i64,
        content: &str,
        created_at: NaiveDateTime,
    ) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO total_summary (created_at, updated_at, user_id, total_content) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(created_at)
        .bind(created_at)
        .bind(member_id)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn insert_notification(&self, notification: &NewNotification) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO notification \
             (created_at, updated_at, notification_title, member_id, notification_content, \
              notification_is_read, notification_type) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(notification.created_at)
        .bind(notification.created_at)
        .bind(&notification.title)
        .bind(notification.member_id)
        .bind(&notification.content)
        .bind(false)
        .bind(&notification.kind)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }
}
