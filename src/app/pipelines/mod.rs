pub mod disclosure;
pub mod main_news;
pub mod news;
pub mod stock_summary;
pub mod total_summary;

pub use disclosure::{DisclosurePipeline, DisclosureWindow};
pub use main_news::MainNewsPipeline;
pub use news::NewsPipeline;
pub use stock_summary::StockSummaryPipeline;
pub use total_summary::TotalSummaryPipeline;

use crate::config::{AnalysisConfig, OpenAiConfig, PacingConfig};
use crate::domain::ports::{ChatRequest, LlmClient};
use crate::utils::error::Result;
use crate::utils::retry::RetryPolicy;
use std::time::Duration;

/// 摘要類工作共用的 LLM 設定
#[derive(Debug, Clone)]
pub struct SummarySettings {
    pub model: String,
    pub retry: RetryPolicy,
    pub between_comments: Duration,
    pub between_stocks: Duration,
}

impl SummarySettings {
    pub fn from_config(analysis: &AnalysisConfig, openai: &OpenAiConfig, pacing: &PacingConfig) -> Self {
        Self {
            model: openai.summary_model.clone(),
            retry: RetryPolicy::fixed(analysis.max_llm_retries, pacing.llm_retry_delay()),
            between_comments: pacing.between_comments(),
            between_stocks: pacing.between_stocks(),
        }
    }

    pub fn request(&self, prompt: String, temperature: f32, max_tokens: Option<u32>) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            prompt,
            temperature,
            max_tokens,
        }
    }
}

/// 任何錯誤都依固定間隔重試，回傳去掉前後空白的內容
pub(crate) async fn complete_text(
    llm: &dyn LlmClient,
    retry: &RetryPolicy,
    label: &str,
    request: &ChatRequest,
) -> Result<String> {
    let completion = retry.run(label, |_| true, || llm.complete(request)).await?;
    Ok(completion.content.trim().to_string())
}

pub(crate) async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
