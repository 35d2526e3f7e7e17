use crate::analysis::prompts;
use crate::app::pipelines::{complete_text, pause, SummarySettings};
use crate::core::{LoadReport, Pipeline};
use crate::domain::model::{NewInvestmentComment, NewSummary, StockNews};
use crate::domain::ports::{LlmClient, Repository};
use crate::utils::error::Result;
use crate::utils::time::{kst_day_bounds, now_kst_naive, today_kst};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

const SUMMARY_TEMPERATURE: f32 = 0.5;
const COMMENT_TEMPERATURE: f32 = 0.7;
const COMMENT_MAX_TOKENS: u32 = 1000;

/// 同一檔股票今天的新聞
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockNewsGroup {
    pub stock_id: String,
    pub stock_name: String,
    pub content: String,
    pub image_url: Option<String>,
}

/// 依 stock_id 分組 (保留第一次出現的順序)，合併非空內文並取第一張圖
pub fn group_by_stock(rows: Vec<StockNews>) -> Vec<StockNewsGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Option<String>, Vec<String>, Option<String>)> = HashMap::new();

    for row in rows {
        let Some(stock_id) = row.stock_id.filter(|id| !id.is_empty()) else {
            continue;
        };
        let entry = groups.entry(stock_id.clone()).or_insert_with(|| {
            order.push(stock_id.clone());
            (row.stock_name.clone(), Vec::new(), None)
        });
        if let Some(content) = row.news_content.filter(|c| !c.is_empty()) {
            entry.1.push(content);
        }
        if entry.2.is_none() {
            entry.2 = row.news_image.filter(|i| !i.is_empty());
        }
    }

    order
        .into_iter()
        .filter_map(|stock_id| {
            let (name, contents, image_url) = groups.remove(&stock_id)?;
            if contents.is_empty() {
                tracing::info!("Skipping {} - no news content today", stock_id);
                return None;
            }
            Some(StockNewsGroup {
                stock_name: name.unwrap_or_else(|| "Unknown".to_string()),
                stock_id,
                content: contents.join("\n\n"),
                image_url,
            })
        })
        .collect()
}

/// 今日新聞 → 個股摘要 → 各投資傾向評論 → 持股會員 snapshot
pub struct StockSummaryPipeline {
    repository: Arc<dyn Repository>,
    llm: Arc<dyn LlmClient>,
    settings: SummarySettings,
}

impl StockSummaryPipeline {
    pub fn new(repository: Arc<dyn Repository>, llm: Arc<dyn LlmClient>, settings: SummarySettings) -> Self {
        Self {
            repository,
            llm,
            settings,
        }
    }

    /// 一檔股票：摘要 → 寫入 → 各傾向評論 → snapshot。
    /// 摘要產生或寫入失敗才算失敗，評論與 snapshot 的錯誤只記錄
    async fn process(&self, group: &StockNewsGroup) -> Result<()> {
        tracing::info!("📝 Summarising {} ({})", group.stock_name, group.stock_id);
        let request = self.settings.request(
            prompts::stock_summary(&group.stock_name, &group.content),
            SUMMARY_TEMPERATURE,
            None,
        );
        let summary = complete_text(self.llm.as_ref(), &self.settings.retry, "stock summary", &request).await?;

        let created_at = now_kst_naive();
        let summary_id = self
            .repository
            .insert_summary(&NewSummary {
                stock_id: group.stock_id.clone(),
                content: summary.clone(),
                image_url: group.image_url.clone(),
                created_at,
            })
            .await?;

        let investment_types = self.repository.list_investment_types().await.unwrap_or_else(|e| {
            tracing::error!("❌ Failed to load investment types: {}", e);
            Vec::new()
        });
        tracing::debug!("Loaded {} investment types", investment_types.len());

        let mut comment_ids: HashMap<i64, u64> = HashMap::new();
        for investment_type in &investment_types {
            let request = self.settings.request(
                prompts::commentary(&investment_type.name, &summary),
                COMMENT_TEMPERATURE,
                Some(COMMENT_MAX_TOKENS),
            );
            let comment = match complete_text(self.llm.as_ref(), &self.settings.retry, "commentary", &request).await {
                Ok(comment) => comment,
                Err(e) => {
                    tracing::error!("❌ Commentary failed ({}): {}", investment_type.name, e);
                    continue;
                }
            };

            match self
                .repository
                .insert_investment_comment(&NewInvestmentComment {
                    summary_id,
                    investment_type_id: investment_type.id,
                    content: comment,
                    created_at,
                })
                .await
            {
                Ok(comment_id) => {
                    comment_ids.insert(investment_type.id, comment_id);
                }
                Err(e) => tracing::error!("❌ Failed to store commentary ({}): {}", investment_type.name, e),
            }
            pause(self.settings.between_comments).await;
        }

        let members = self
            .repository
            .holding_members(&group.stock_id)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("❌ Failed to load holders of {}: {}", group.stock_id, e);
                Vec::new()
            });
        tracing::debug!("{} members hold {}", members.len(), group.stock_id);

        for member in &members {
            let Some(comment_id) = member
                .investment_type_id
                .and_then(|type_id| comment_ids.get(&type_id).copied())
            else {
                continue;
            };
            if let Err(e) = self
                .repository
                .insert_snapshot(member.member_id, comment_id, created_at)
                .await
            {
                tracing::error!("❌ Failed to store snapshot for member {}: {}", member.member_id, e);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Pipeline for StockSummaryPipeline {
    type Extracted = Vec<StockNews>;
    type Transformed = Vec<StockNewsGroup>;

    fn name(&self) -> &'static str {
        "stock-summary"
    }

    async fn extract(&self) -> Result<Vec<StockNews>> {
        let (start, end) = kst_day_bounds(today_kst());
        tracing::info!("Loading news created between {} and {} (KST)", start, end);
        self.repository.news_created_between(start, end).await
    }

    async fn transform(&self, rows: Vec<StockNews>) -> Result<Vec<StockNewsGroup>> {
        Ok(group_by_stock(rows))
    }

    async fn load(&self, groups: Vec<StockNewsGroup>) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for (idx, group) in groups.iter().enumerate() {
            if idx > 0 {
                pause(self.settings.between_stocks).await;
            }
            match self.process(group).await {
                Ok(()) => report.stored += 1,
                Err(e) => {
                    tracing::error!("❌ Summary failed for {}: {}", group.stock_id, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(stock: Option<&str>, content: Option<&str>, image: Option<&str>) -> StockNews {
        StockNews {
            stock_id: stock.map(str::to_string),
            stock_name: stock.map(|s| format!("{s} Inc.")),
            news_content: content.map(str::to_string),
            news_image: image.map(str::to_string),
        }
    }

    #[test]
    fn test_group_by_stock() {
        let groups = group_by_stock(vec![
            row(Some("MSFT"), Some("m1"), None),
            row(Some("AAPL"), Some("a1"), None),
            row(None, Some("orphan"), None),
            row(Some("MSFT"), None, Some("img-1")),
            row(Some("MSFT"), Some("m2"), Some("img-2")),
            row(Some("TSLA"), Some(""), None),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].stock_id, "MSFT");
        assert_eq!(groups[0].content, "m1\n\nm2");
        assert_eq!(groups[0].image_url.as_deref(), Some("img-1"));
        assert_eq!(groups[1].stock_id, "AAPL");
        assert_eq!(groups[1].stock_name, "AAPL Inc.");
    }

    #[test]
    fn test_unknown_name() {
        let groups = group_by_stock(vec![StockNews {
            stock_id: Some("X".to_string()),
            stock_name: None,
            news_content: Some("c".to_string()),
            news_image: None,
        }]);
        assert_eq!(groups[0].stock_name, "Unknown");
    }
}
