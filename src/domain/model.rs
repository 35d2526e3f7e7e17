use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 8-K 查詢條件，日期區間兩端都包含
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingQuery {
    pub ticker: String,
    pub after: NaiveDate,
    pub before: NaiveDate,
    pub limit: Option<usize>,
}

/// 下載完成的 8-K 全文 (full submission text)
#[derive(Debug, Clone)]
pub struct FilingDocument {
    pub ticker: String,
    pub accession_number: String,
    pub filing_date: NaiveDate,
    pub content: String,
}

/// 單份公告的 LLM 分析結果。`cost_usd` 只在內部使用，不回傳給客戶端。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingAnalysis {
    pub title: String,
    pub narrative: String,
    pub filing_date: String,
    #[serde(skip)]
    pub cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub news_title: String,
    pub news_uri: String,
    pub news_content: String,
    pub news_date: Option<String>,
    pub news_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub stock_id: String,
    pub stock_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDisclosure {
    pub stock_id: String,
    pub disclosure_date: NaiveDate,
    pub title: String,
    pub summary: String,
    pub created_at: NaiveDateTime,
}

/// 今日新聞列 (news LEFT JOIN stock)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockNews {
    pub stock_id: Option<String>,
    pub stock_name: Option<String>,
    pub news_content: Option<String>,
    pub news_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSummary {
    pub stock_id: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvestmentComment {
    pub summary_id: u64,
    pub investment_type_id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
}

/// 持有某檔股票的會員，以及他的投資傾向
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingMember {
    pub member_id: i64,
    pub investment_type_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub member_id: i64,
    pub title: String,
    pub content: String,
    pub kind: String,
    pub created_at: NaiveDateTime,
}

/// ETL 載入階段的統計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.stored += other.stored;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}
