use crate::analysis::prompts::{self, TOTAL_SUMMARY_FALLBACK};
use crate::app::pipelines::{complete_text, SummarySettings};
use crate::core::{LoadReport, Pipeline};
use crate::domain::model::NewNotification;
use crate::domain::ports::{LlmClient, Repository};
use crate::utils::error::Result;
use crate::utils::time::{korean_date, kst_day_bounds, now_kst_naive, today_kst};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

const TOTAL_TEMPERATURE: f32 = 0.5;
const TOTAL_MAX_TOKENS: u32 = 500;
pub const NOTIFICATION_KIND: &str = "SUMMARY_COMPLETE";

/// 會員今天收到的評論
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberComments {
    pub member_id: i64,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberTotalSummary {
    pub member_id: i64,
    pub content: String,
    pub stock_count: usize,
}

pub fn notification_title(date: NaiveDate) -> String {
    format!("{} 총평 요약 도착!", korean_date(date))
}

pub fn notification_content(stock_count: usize) -> String {
    format!("{}개 종목에 대한 총평 요약이 도착했어요. 확인해보세요!", stock_count)
}

/// 會員今日 snapshot 評論 → 總評 → `total_summary` + 通知
pub struct TotalSummaryPipeline {
    repository: Arc<dyn Repository>,
    llm: Arc<dyn LlmClient>,
    settings: SummarySettings,
}

impl TotalSummaryPipeline {
    pub fn new(repository: Arc<dyn Repository>, llm: Arc<dyn LlmClient>, settings: SummarySettings) -> Self {
        Self {
            repository,
            llm,
            settings,
        }
    }
}

#[async_trait]
impl Pipeline for TotalSummaryPipeline {
    type Extracted = Vec<MemberComments>;
    type Transformed = Vec<MemberTotalSummary>;

    fn name(&self) -> &'static str {
        "total-summary"
    }

    async fn extract(&self) -> Result<Vec<MemberComments>> {
        let (start, end) = kst_day_bounds(today_kst());
        let member_ids = self.repository.list_member_ids().await?;

        let mut members = Vec::new();
        for member_id in member_ids {
            match self.repository.snapshot_comments_between(member_id, start, end).await {
                Ok(comments) if !comments.is_empty() => members.push(MemberComments { member_id, comments }),
                Ok(_) => {}
                Err(e) => tracing::error!("❌ Failed to load snapshots for member {}: {}", member_id, e),
            }
        }
        Ok(members)
    }

    async fn transform(&self, members: Vec<MemberComments>) -> Result<Vec<MemberTotalSummary>> {
        let mut summaries = Vec::with_capacity(members.len());
        for member in members {
            let request = self.settings.request(
                prompts::total_summary(&member.comments.join("\n")),
                TOTAL_TEMPERATURE,
                Some(TOTAL_MAX_TOKENS),
            );
            let content = complete_text(self.llm.as_ref(), &self.settings.retry, "total summary", &request)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("❌ Total summary failed for member {}: {}", member.member_id, e);
                    TOTAL_SUMMARY_FALLBACK.to_string()
                });
            tracing::info!("🧾 Total summary ready for member {}", member.member_id);
            summaries.push(MemberTotalSummary {
                member_id: member.member_id,
                content,
                stock_count: member.comments.len(),
            });
        }
        Ok(summaries)
    }

    async fn load(&self, summaries: Vec<MemberTotalSummary>) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        let title = notification_title(today_kst());

        for summary in &summaries {
            let created_at = now_kst_naive();
            if let Err(e) = self
                .repository
                .insert_total_summary(summary.member_id, &summary.content, created_at)
                .await
            {
                tracing::error!("❌ Failed to store total summary for member {}: {}", summary.member_id, e);
                report.failed += 1;
                continue;
            }

            let notification = NewNotification {
                member_id: summary.member_id,
                title: title.clone(),
                content: notification_content(summary.stock_count),
                kind: NOTIFICATION_KIND.to_string(),
                created_at,
            };
            match self.repository.insert_notification(&notification).await {
                Ok(_) => report.stored += 1,
                Err(e) => {
                    tracing::error!("❌ Failed to notify member {}: {}", summary.member_id, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
