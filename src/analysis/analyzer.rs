use crate::analysis::extract::{estimate_tokens, FilingExtractor};
use crate::analysis::prompts;
use crate::config::{AnalysisConfig, OpenAiConfig, PacingConfig};
use crate::domain::model::{FilingAnalysis, FilingDocument};
use crate::domain::ports::{ChatRequest, LlmClient};
use crate::utils::error::{DigestError, Result};
use crate::utils::retry::RetryPolicy;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

const ESTIMATE_WINDOW_CHARS: usize = 15000;
const ESTIMATE_TOKEN_RATIO: f64 = 0.4;
pub const NO_FILINGS_TITLE: &str = "분석 가능한 공시 없음";
pub const NO_FILINGS_NARRATIVE: &str = "중요 정보가 없거나 문서 형식이 비정상입니다.";

static ISO_DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());

/// 分析器設定
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub model: String,
    pub max_cost_usd: f64,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
    pub estimate_cost_per_1k: f64,
    /// 429 時的總嘗試次數
    pub rate_limit_attempts: u32,
    pub between_filings: Duration,
    pub rate_limit_backoff_base: Duration,
}

impl AnalyzerSettings {
    pub fn from_config(analysis: &AnalysisConfig, openai: &OpenAiConfig, pacing: &PacingConfig) -> Self {
        Self {
            model: openai.analysis_model.clone(),
            max_cost_usd: analysis.max_cost_usd,
            max_output_tokens: analysis.max_output_tokens,
            temperature: analysis.temperature,
            input_cost_per_1k: analysis.input_cost_per_1k,
            output_cost_per_1k: analysis.output_cost_per_1k,
            estimate_cost_per_1k: analysis.estimate_cost_per_1k,
            rate_limit_attempts: analysis.rate_limit_attempts,
            between_filings: pacing.between_filings(),
            rate_limit_backoff_base: pacing.rate_limit_backoff_base(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalysisReply {
    title: Option<String>,
    narrative: Option<String>,
    filing_date: Option<String>,
}

/// 去掉 ```json ... ``` 包裝
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_reply(reply: &str) -> Result<AnalysisReply> {
    Ok(serde_json::from_str(strip_code_fence(reply))?)
}

/// 8-K 分析器：整理內容、呼叫 LLM、控制預算
pub struct FilingAnalyzer {
    llm: Arc<dyn LlmClient>,
    settings: AnalyzerSettings,
}

impl FilingAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, settings: AnalyzerSettings) -> Self {
        Self { llm, settings }
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    fn pre_estimate(&self, raw: &str) -> f64 {
        let window: String = raw.chars().take(ESTIMATE_WINDOW_CHARS).collect();
        let tokens = estimate_tokens(&window) as f64 * ESTIMATE_TOKEN_RATIO;
        tokens / 1000.0 * self.settings.estimate_cost_per_1k
    }

    fn cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        input_tokens as f64 * self.settings.input_cost_per_1k / 1000.0
            + output_tokens as f64 * self.settings.output_cost_per_1k / 1000.0
    }

    /// 依序分析；花費達到上限就停止。沒有任何結果時回傳一筆佔位結果。
    pub async fn analyze(&self, docs: &[FilingDocument], default_date: NaiveDate) -> Vec<FilingAnalysis> {
        let mut total_cost = 0.0;
        let mut output = Vec::new();
        let retry = RetryPolicy::exponential(
            self.settings.rate_limit_attempts.saturating_sub(1),
            self.settings.rate_limit_backoff_base,
        );

        for (idx, doc) in docs.iter().enumerate() {
            tracing::info!("🔍 Analysing filing {} ({}/{})", doc.accession_number, idx + 1, docs.len());

            if total_cost + self.pre_estimate(&doc.content) > self.settings.max_cost_usd {
                tracing::warn!("💸 Estimated cost exceeds budget, skipping {}", doc.accession_number);
                continue;
            }

            let prepared = FilingExtractor::new(doc.filing_date).prepare(&doc.content);
            let filing_date = prepared.filing_date.format("%Y-%m-%d").to_string();

            if idx > 0 && !self.settings.between_filings.is_zero() {
                tokio::time::sleep(self.settings.between_filings).await;
            }

            let request = ChatRequest {
                model: self.settings.model.clone(),
                prompt: prompts::filing_analysis(&filing_date, &prepared.content),
                temperature: self.settings.temperature,
                max_tokens: Some(self.settings.max_output_tokens),
            };

            let completion = match retry
                .run("filing analysis", DigestError::is_rate_limited, || self.llm.complete(&request))
                .await
            {
                Ok(completion) => completion,
                Err(e) => {
                    tracing::error!("❌ LLM request failed for {}: {}", doc.accession_number, e);
                    continue;
                }
            };

            let reply = match parse_reply(&completion.content) {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!("❌ Could not parse analysis JSON for {}: {}", doc.accession_number, e);
                    continue;
                }
            };

            let input_tokens = completion
                .prompt_tokens
                .unwrap_or_else(|| estimate_tokens(&request.prompt) as u32);
            let output_tokens = completion
                .completion_tokens
                .unwrap_or_else(|| estimate_tokens(&completion.content) as u32);
            let cost = self.cost(input_tokens, output_tokens);
            total_cost += cost;

            output.push(FilingAnalysis {
                title: reply.title.unwrap_or_else(|| "제목 없음".to_string()),
                narrative: reply.narrative.unwrap_or_else(|| "내용 없음".to_string()),
                filing_date: reply
                    .filing_date
                    .filter(|d| ISO_DATE_PREFIX.is_match(d))
                    .unwrap_or(filing_date),
                cost_usd: cost,
            });
            tracing::info!("✅ Filing {} analysed (cost ${:.4})", doc.accession_number, cost);

            if total_cost >= self.settings.max_cost_usd {
                tracing::info!("💸 Budget exhausted after {} filings", output.len());
                break;
            }
        }

        if output.is_empty() {
            output.push(FilingAnalysis {
                title: NO_FILINGS_TITLE.to_string(),
                narrative: NO_FILINGS_NARRATIVE.to_string(),
                filing_date: default_date.format("%Y-%m-%d").to_string(),
                cost_usd: 0.0,
            });
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ChatCompletion;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Scripted {
        Reply(&'static str, Option<(u32, u32)>),
        Status(u16),
    }

    struct ScriptedLlm {
        script: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedLlm {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion> {
            self.calls.lock().unwrap().push(request.clone());
            match self.script.lock().unwrap().pop_front() {
                Some(Scripted::Reply(content, usage)) => Ok(ChatCompletion {
                    content: content.to_string(),
                    prompt_tokens: usage.map(|u| u.0),
                    completion_tokens: usage.map(|u| u.1),
                }),
                Some(Scripted::Status(status)) => Err(DigestError::llm(Some(status), "scripted")),
                None => Err(DigestError::llm(None, "script exhausted")),
            }
        }
    }

    fn settings() -> AnalyzerSettings {
        AnalyzerSettings::from_config(&AnalysisConfig::default(), &OpenAiConfig::default(), &PacingConfig::none())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn doc(accession: &str, content: &str) -> FilingDocument {
        FilingDocument {
            ticker: "AAPL".to_string(),
            accession_number: accession.to_string(),
            filing_date: ymd(2025, 7, 20),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {} "), "{}");
    }

    #[tokio::test]
    async fn test_empty_input_gives_placeholder() {
        let llm = ScriptedLlm::new(vec![]);
        let analyzer = FilingAnalyzer::new(llm.clone(), settings());
        let results = analyzer.analyze(&[], ymd(2025, 7, 1)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, NO_FILINGS_TITLE);
        assert_eq!(results[0].filing_date, "2025-07-01");
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reply_fields_and_date_fallback() {
        let llm = ScriptedLlm::new(vec![Scripted::Reply(
            "```json\n{\"title\": \"배당 발표\", \"narrative\": \"내용\", \"filing_date\": \"unknown\"}\n```",
            Some((1000, 500)),
        )]);
        let analyzer = FilingAnalyzer::new(llm, settings());
        let results = analyzer
            .analyze(&[doc("0001", "FILED AS OF DATE: 20250726 Board declared a dividend.")], ymd(2025, 7, 1))
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "배당 발표");
        assert_eq!(results[0].filing_date, "2025-07-26");
        let expected = 1000.0 * 0.00015 / 1000.0 + 500.0 * 0.0006 / 1000.0;
        assert!((results[0].cost_usd - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_missing_fields_get_defaults() {
        let llm = ScriptedLlm::new(vec![Scripted::Reply("{}", None)]);
        let analyzer = FilingAnalyzer::new(llm, settings());
        let results = analyzer.analyze(&[doc("0001", "plain text")], ymd(2025, 7, 1)).await;
        assert_eq!(results[0].title, "제목 없음");
        assert_eq!(results[0].narrative, "내용 없음");
        assert_eq!(results[0].filing_date, "2025-07-20");
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_other_errors_skip() {
        let llm = ScriptedLlm::new(vec![
            Scripted::Status(429),
            Scripted::Reply("{\"title\":\"A\",\"narrative\":\"B\",\"filing_date\":\"2025-07-02\"}", None),
            Scripted::Status(500),
            Scripted::Reply("not json", None),
        ]);
        let analyzer = FilingAnalyzer::new(llm.clone(), settings());
        let docs = [doc("1", "one"), doc("2", "two"), doc("3", "three")];
        let results = analyzer.analyze(&docs, ymd(2025, 7, 1)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filing_date, "2025-07-02");
        assert_eq!(llm.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_configured_attempts() {
        let llm = ScriptedLlm::new((0..6).map(|_| Scripted::Status(429)).collect());
        let analyzer = FilingAnalyzer::new(llm.clone(), settings());
        let results = analyzer.analyze(&[doc("1", "one")], ymd(2025, 7, 1)).await;
        assert_eq!(results[0].title, NO_FILINGS_TITLE);
        assert_eq!(llm.calls.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_budget_stops_processing() {
        let mut settings = settings();
        settings.max_cost_usd = 0.0001;
        let llm = ScriptedLlm::new(vec![
            Scripted::Reply("{\"title\":\"A\",\"narrative\":\"B\"}", Some((1000, 1000))),
            Scripted::Reply("{\"title\":\"C\",\"narrative\":\"D\"}", Some((1000, 1000))),
        ]);
        let analyzer = FilingAnalyzer::new(llm.clone(), settings);
        let results = analyzer.analyze(&[doc("1", "one"), doc("2", "two")], ymd(2025, 7, 1)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(llm.calls.lock().unwrap().len(), 1);
    }
}
