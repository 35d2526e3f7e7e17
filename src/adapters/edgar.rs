use crate::config::SecConfig;
use crate::domain::model::{FilingDocument, FilingQuery};
use crate::domain::ports::{FilingSource, Storage};
use crate::utils::error::{DigestError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;

const FORM_8K: &str = "8-K";

#[derive(Debug, Deserialize)]
struct TickerEntry {
    cik_str: u64,
    ticker: String,
}

#[derive(Debug, Deserialize)]
struct Submissions {
    filings: SubmissionFilings,
}

#[derive(Debug, Deserialize)]
struct SubmissionFilings {
    recent: RecentFilings,
}

/// submissions API 以欄為單位回傳，同一索引為同一份公告
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentFilings {
    #[serde(default)]
    accession_number: Vec<String>,
    #[serde(default)]
    filing_date: Vec<String>,
    #[serde(default)]
    form: Vec<String>,
}

/// 一筆待下載的 8-K
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingRef {
    pub accession_number: String,
    pub filing_date: NaiveDate,
}

impl RecentFilings {
    /// 只留 form 完全等於 8-K (不含 8-K/A) 且日期落在區間內的，最新的在前
    fn eight_ks_between(&self, after: NaiveDate, before: NaiveDate) -> Vec<FilingRef> {
        let mut refs: Vec<FilingRef> = self
            .form
            .iter()
            .zip(&self.accession_number)
            .zip(&self.filing_date)
            .filter(|((form, _), _)| form.as_str() == FORM_8K)
            .filter_map(|((_, accession), date)| {
                let filing_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
                (after..=before).contains(&filing_date).then(|| FilingRef {
                    accession_number: accession.clone(),
                    filing_date,
                })
            })
            .collect();
        refs.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));
        refs
    }
}

/// SEC EDGAR 8-K 下載器，遵守 fair access policy (User-Agent + 請求間隔)
pub struct EdgarClient<S: Storage> {
    client: Client,
    www_base_url: String,
    data_base_url: String,
    min_document_chars: usize,
    request_delay: Duration,
    storage: S,
    tickers: OnceCell<HashMap<String, u64>>,
}

impl<S: Storage> EdgarClient<S> {
    pub fn new(config: &SecConfig, request_delay: Duration, storage: S) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent())
            .build()?;

        tracing::info!("🏛️ SEC client initialised as '{}'", config.user_agent());

        Ok(Self {
            client,
            www_base_url: config.www_base_url.trim_end_matches('/').to_string(),
            data_base_url: config.data_base_url.trim_end_matches('/').to_string(),
            min_document_chars: config.min_document_chars,
            request_delay,
            storage,
            tickers: OnceCell::new(),
        })
    }

    /// 每次對 SEC 發請求前先等待，並把 403 轉成 fair access 錯誤
    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        tracing::debug!("Making SEC request to: {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN {
            tracing::error!(
                "🚫 SEC returned 403 for {}. Set SEC_COMPANY_NAME and SEC_EMAIL_ADDRESS to real values and retry in an hour or two",
                url
            );
            return Err(DigestError::SecAccessDenied { url: url.to_string() });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DigestError::UpstreamError {
                service: "SEC EDGAR".to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn ticker_map(&self) -> Result<&HashMap<String, u64>> {
        self.tickers
            .get_or_try_init(|| async {
                let url = format!("{}/files/company_tickers.json", self.www_base_url);
                let entries: HashMap<String, TickerEntry> = self.get(&url).await?.json().await?;
                tracing::info!("📇 Loaded {} SEC ticker mappings", entries.len());
                Ok::<_, DigestError>(
                    entries
                        .into_values()
                        .map(|e| (e.ticker.to_uppercase(), e.cik_str))
                        .collect(),
                )
            })
            .await
    }

    pub async fn lookup_cik(&self, ticker: &str) -> Result<Option<u64>> {
        Ok(self.ticker_map().await?.get(&ticker.to_uppercase()).copied())
    }

    pub async fn list_8k(&self, cik: u64, after: NaiveDate, before: NaiveDate) -> Result<Vec<FilingRef>> {
        let url = format!("{}/submissions/CIK{:010}.json", self.data_base_url, cik);
        let submissions: Submissions = self.get(&url).await?.json().await?;
        Ok(submissions.filings.recent.eight_ks_between(after, before))
    }

    pub fn cache_path(ticker: &str, accession_number: &str) -> String {
        format!(
            "sec-edgar-filings/{}/8-K/{}/full-submission.txt",
            ticker.to_uppercase(),
            accession_number
        )
    }

    /// 先查快取，沒有才下載並寫入快取
    async fn download(&self, ticker: &str, cik: u64, filing: &FilingRef) -> Result<String> {
        let cache_path = Self::cache_path(ticker, &filing.accession_number);
        if self.storage.exists(&cache_path).await {
            let bytes = self.storage.read_file(&cache_path).await?;
            tracing::debug!("📦 Cache hit: {}", cache_path);
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }

        let url = format!(
            "{}/Archives/edgar/data/{}/{}/{}.txt",
            self.www_base_url,
            cik,
            filing.accession_number.replace('-', ""),
            filing.accession_number
        );
        let bytes = self.get(&url).await?.bytes().await?;

        if let Err(e) = self.storage.write_file(&cache_path, &bytes).await {
            tracing::warn!("⚠️ Could not cache {}: {}", cache_path, e);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl<S: Storage> FilingSource for EdgarClient<S> {
    async fn fetch_8k_filings(&self, query: &FilingQuery) -> Result<Vec<FilingDocument>> {
        let ticker = query.ticker.to_uppercase();
        tracing::info!(
            "🔎 Searching 8-K filings for {} between {} and {} (limit {:?})",
            ticker,
            query.after,
            query.before,
            query.limit
        );

        let Some(cik) = self.lookup_cik(&ticker).await? else {
            tracing::warn!("⚠️ Unknown ticker: {}", ticker);
            return Ok(Vec::new());
        };

        let limit = query.limit.unwrap_or(usize::MAX);
        let mut docs = Vec::new();

        for filing in self.list_8k(cik, query.after, query.before).await? {
            if docs.len() >= limit {
                break;
            }

            let content = match self.download(&ticker, cik, &filing).await {
                Ok(content) => content,
                Err(e @ DigestError::SecAccessDenied { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!("⚠️ Failed to download {}: {}", filing.accession_number, e);
                    continue;
                }
            };

            if content.trim().chars().count() <= self.min_document_chars {
                tracing::debug!("Skipping short filing {}", filing.accession_number);
                continue;
            }

            tracing::info!(
                "📄 Loaded {} ({} chars)",
                filing.accession_number,
                content.len()
            );
            docs.push(FilingDocument {
                ticker: ticker.clone(),
                accession_number: filing.accession_number,
                filing_date: filing.filing_date,
                content,
            });
        }

        tracing::info!("✅ Loaded {} 8-K filings for {}", docs.len(), ticker);
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn recent() -> RecentFilings {
        RecentFilings {
            accession_number: vec!["a-1".into(), "a-2".into(), "a-3".into(), "a-4".into(), "a-5".into()],
            filing_date: vec![
                "2025-07-01".into(),
                "2025-07-20".into(),
                "2025-07-15".into(),
                "2025-05-01".into(),
                "bad".into(),
            ],
            form: vec!["8-K".into(), "8-K".into(), "8-K/A".into(), "8-K".into(), "8-K".into()],
        }
    }

    #[test]
    fn test_eight_ks_filtered_and_sorted() {
        let refs = recent().eight_ks_between(ymd(2025, 6, 1), ymd(2025, 7, 31));
        let ids: Vec<&str> = refs.iter().map(|r| r.accession_number.as_str()).collect();
        assert_eq!(ids, vec!["a-2", "a-1"]);
    }

    #[test]
    fn test_window_is_inclusive() {
        let refs = recent().eight_ks_between(ymd(2025, 7, 1), ymd(2025, 7, 1));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].accession_number, "a-1");
    }

    #[test]
    fn test_cache_path_uppercases_ticker() {
        assert_eq!(
            EdgarClient::<crate::adapters::storage::LocalStorage>::cache_path("aapl", "0000320193-25-000071"),
            "sec-edgar-filings/AAPL/8-K/0000320193-25-000071/full-submission.txt"
        );
    }
}
