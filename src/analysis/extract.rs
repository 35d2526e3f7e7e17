use crate::analysis::dates::FilingDateExtractor;
use crate::analysis::sanitize::{parse_document, sanitize_markup, stripped_text, visible_text, HIDDEN_TAGS};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

const TABLE_KEYWORDS: [&str; 11] = [
    "merger", "agreement", "officer", "director", "shares", "vote", "financial", "revenue",
    "earnings", "dividend", "debt",
];

/// 句子加權用關鍵字
const WEIGHTED_KEYWORDS: [(&str, f64); 22] = [
    ("merger", 2.0),
    ("acquisition", 2.0),
    ("definitive agreement", 2.0),
    ("agreement", 1.0),
    ("revenue", 1.5),
    ("earnings", 1.5),
    ("net income", 1.5),
    ("guidance", 1.5),
    ("dividend", 1.5),
    ("resign", 1.5),
    ("appoint", 1.5),
    ("chief executive", 1.5),
    ("officer", 1.0),
    ("director", 1.0),
    ("terminat", 1.5),
    ("settlement", 1.5),
    ("litigation", 1.5),
    ("shares", 1.0),
    ("debt", 1.0),
    ("million", 0.5),
    ("billion", 1.0),
    ("financial", 0.5),
];

const MAX_TABLES: usize = 3;
const MAX_EMPHASES: usize = 15;
const MIN_EMPHASIS_CHARS: usize = 10;
const MIN_BLOCK_CHARS: usize = 80;
const MAX_BLOCK_CHARS: usize = 1500;
const MAX_SENTENCES: usize = 12;
const MIN_SENTENCE_CHARS: usize = 40;
const MIN_SENTENCE_SCORE: f64 = 1.5;
const MAX_FIGURES: usize = 10;
const MAX_PARTS: usize = 15;
const MAX_CONTENT_TOKENS: usize = 4500;
const TRUNCATED_CONTENT_CHARS: usize = 12000;
const MAX_TABLE_SECTION_CHARS: usize = 1500;

static ITEM_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)item[\s.\x{a0}]*\d+[\s.\x{a0}]*[.:,]?\s*\d+|signature").unwrap()
});

static SENTENCE_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

static FINANCIAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\$\d[\d,]*(?:\.\d{2})?(?:\s*(?:million|billion|trillion|백만|억|조))?",
        r"(?i)\d[\d,]*(?:\.\d{2})?\s*(?:million|billion|trillion|백만|억|조)\s*(?:달러|dollars?)",
        r"(?i)\d[\d,]*(?:\.\d{2})?\s*(?:shares?|주식|주)",
        r"(?i)\d[\d,]*(?:\.\d{2})?\s*(?:percent|%)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static EMPHASIS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("b, strong, u, em").unwrap());

/// 8-K Item 區塊定義
#[derive(Debug)]
pub struct ItemSpec {
    pub label: &'static str,
    pub importance: u8,
    header: Regex,
}

impl ItemSpec {
    fn new(major: u8, minor: u8, label: &'static str, importance: u8) -> Self {
        // 接受 "Item 1.01" / "ITEM 1. 01" / "Item 1.1"
        let pattern = format!(
            r"(?i)item[\s.\x{{a0}}]*{}\b[\s.\x{{a0}}]*[.:,]?\s*0?{}\b",
            major, minor
        );
        Self {
            label,
            importance,
            header: Regex::new(&pattern).unwrap(),
        }
    }

    /// 從標題到下一個 Item 標題 / "signature" / 文末
    pub fn find_block<'t>(&self, text: &'t str) -> Option<&'t str> {
        let header = self.header.find(text)?;
        let end = ITEM_BOUNDARY
            .find_at(text, header.end())
            .map(|m| m.start())
            .unwrap_or(text.len());
        Some(text[header.start()..end].trim())
    }
}

/// 依重要度由高到低排列
static ITEM_SPECS: LazyLock<Vec<ItemSpec>> = LazyLock::new(|| {
    let mut specs = vec![
        ItemSpec::new(1, 1, "중요 계약 체결", 8),
        ItemSpec::new(1, 2, "계약 종료", 7),
        ItemSpec::new(2, 1, "자산 인수/매각", 9),
        ItemSpec::new(2, 2, "실적 발표", 8),
        ItemSpec::new(3, 2, "주식 매각", 6),
        ItemSpec::new(4, 1, "감사인 변경", 6),
        ItemSpec::new(5, 2, "임원 변경", 9),
        ItemSpec::new(7, 1, "규제 절차", 7),
        ItemSpec::new(8, 1, "기타 중요 사건", 5),
        ItemSpec::new(9, 1, "재무제표 및 전시물", 4),
    ];
    specs.sort_by(|a, b| b.importance.cmp(&a.importance));
    specs
});

/// `smart_filter` 的結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredDocument {
    pub full: String,
    pub tables: Vec<String>,
    pub emphases: Vec<String>,
}

/// 交給 LLM 前整理好的公告內容
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFiling {
    pub filing_date: NaiveDate,
    pub content: String,
}

/// 大約 4 個字元 1 個 token
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| HIDDEN_TAGS.contains(&a.value().name()))
}

/// 金額、股數、百分比；保留第一次出現的順序並去重
pub fn financial_numbers(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for pattern in FINANCIAL_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let value = m.as_str().trim();
            if !out.iter().any(|v| v == value) {
                out.push(value.to_string());
            }
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct FilingExtractor {
    dates: FilingDateExtractor,
}

impl FilingExtractor {
    pub fn new(default_date: NaiveDate) -> Self {
        Self {
            dates: FilingDateExtractor::new(default_date),
        }
    }

    pub fn filing_date(&self, raw: &str) -> NaiveDate {
        self.dates.extract(raw)
    }

    pub fn smart_filter(&self, raw: &str) -> FilteredDocument {
        filter_parsed(&parse_document(raw))
    }

    pub fn important_content(&self, text: &str) -> String {
        let mut parts: Vec<String> = Vec::new();

        for spec in ITEM_SPECS.iter() {
            if let Some(block) = spec.find_block(text) {
                if block.chars().count() > MIN_BLOCK_CHARS {
                    parts.push(format!("[{}]\n{}", spec.label, truncate_chars(block, MAX_BLOCK_CHARS)));
                }
            }
        }

        let mut scored: Vec<(f64, &str)> = SENTENCE_SPLIT
            .split(text)
            .map(str::trim)
            .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
            .filter_map(|s| {
                let lower = s.to_lowercase();
                let score: f64 = WEIGHTED_KEYWORDS
                    .iter()
                    .filter(|(kw, _)| lower.contains(kw))
                    .map(|(_, w)| w)
                    .sum();
                (score >= MIN_SENTENCE_SCORE).then_some((score, s))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        parts.extend(scored.into_iter().take(MAX_SENTENCES).map(|(_, s)| s.to_string()));

        let figures = financial_numbers(text);
        if !figures.is_empty() {
            let shown: Vec<&str> = figures.iter().take(MAX_FIGURES).map(String::as_str).collect();
            parts.push(format!("주요 수치: {}", shown.join(", ")));
        }

        parts.truncate(MAX_PARTS);
        let combined = parts.join("\n\n");
        if estimate_tokens(&combined) > MAX_CONTENT_TOKENS {
            truncate_chars(&combined, TRUNCATED_CONTENT_CHARS).to_string()
        } else {
            combined
        }
    }

    /// 解析一次原文，取出日期與要送給 LLM 的內容
    pub fn prepare(&self, raw: &str) -> PreparedFiling {
        let sanitized = sanitize_markup(raw.as_bytes());
        let html = Html::parse_document(&sanitized);
        let filtered = filter_parsed(&html);
        let filing_date = self.dates.extract_parsed(&sanitized, &html, &filtered.full);

        let mut content = self.important_content(&filtered.full);
        if !filtered.tables.is_empty() {
            content.push_str("\n\n[테이블]\n");
            content.push_str(truncate_chars(&filtered.tables.join("\n"), MAX_TABLE_SECTION_CHARS));
        }
        if !filtered.emphases.is_empty() {
            content.push_str("\n\n[강조]\n");
            content.push_str(&filtered.emphases.join("\n"));
        }

        PreparedFiling {
            filing_date,
            content,
        }
    }
}

fn filter_parsed(html: &Html) -> FilteredDocument {
    let full = visible_text(html.root_element(), " ");

    let tables = html
        .select(&TABLE)
        .filter(|t| !is_hidden(*t))
        .map(|t| stripped_text(t, " "))
        .filter(|text| {
            let lower = text.to_lowercase();
            TABLE_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .take(MAX_TABLES)
        .collect();

    let emphases = html
        .select(&EMPHASIS)
        .filter(|e| !is_hidden(*e))
        .filter(|e| stripped_text(*e, "").chars().count() > MIN_EMPHASIS_CHARS)
        .map(|e| stripped_text(e, " "))
        .take(MAX_EMPHASES)
        .collect();

    FilteredDocument {
        full,
        tables,
        emphases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FilingExtractor {
        FilingExtractor::new(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap())
    }

    const FILLER: &str = "The Company entered into a definitive agreement with the counterparty \
                          under which the parties agreed to customary closing conditions.";

    #[test]
    fn test_item_block_stops_at_next_item() {
        let text = format!("Item 1.01 Entry into a Material Definitive Agreement. {FILLER} Item 9.01 Exhibits.");
        let block = ITEM_SPECS
            .iter()
            .find(|s| s.label == "중요 계약 체결")
            .and_then(|s| s.find_block(&text))
            .unwrap();
        assert!(block.starts_with("Item 1.01"));
        assert!(!block.contains("Exhibits"));
    }

    #[test]
    fn test_item_header_does_not_match_other_majors() {
        let spec = ItemSpec::new(1, 1, "x", 1);
        assert!(spec.find_block("Item 11.01 something").is_none());
        assert!(spec.find_block("ITEM 1.01 something").is_some());
        assert!(spec.find_block("Item 1.1 something").is_some());
    }

    #[test]
    fn test_important_content_orders_items_by_importance() {
        let text = format!(
            "Item 1.01 Material Agreement. {FILLER} Item 5.02 Departure of Directors. \
             The board appointed a new chief executive officer effective immediately after the meeting. \
             SIGNATURE Pursuant to the requirements"
        );
        let content = extractor().important_content(&text);
        let officers = content.find("[임원 변경]").unwrap();
        let agreement = content.find("[중요 계약 체결]").unwrap();
        assert!(officers < agreement);
        assert!(!content.contains("Pursuant to the requirements\n"));
    }

    #[test]
    fn test_short_blocks_are_dropped() {
        let content = extractor().important_content("Item 8.01 Other Events. None. SIGNATURE");
        assert!(!content.contains("[기타 중요 사건]"));
    }

    #[test]
    fn test_financial_numbers_dedup_in_order() {
        let nums = financial_numbers("Revenue of $1,200 million and $1,200 million again; 5,000 shares; 12.50%");
        assert_eq!(nums, vec!["$1,200 million", "5,000 shares", "12.50%"]);
    }

    #[test]
    fn test_financial_numbers_need_a_digit() {
        assert!(financial_numbers("a , shares and % percent").is_empty());
    }

    #[test]
    fn test_figures_line_is_added() {
        let content = extractor().important_content("The company paid $5.00 per share.");
        assert_eq!(content, "주요 수치: $5.00");
    }

    #[test]
    fn test_smart_filter_tables_and_emphasis() {
        let raw = "<html><body>\
            <table><tr><td>Revenue</td><td>100</td></tr></table>\
            <table><tr><td>Unrelated</td></tr></table>\
            <p><b>Important emphasised note</b> <b>short</b></p>\
            <nav><b>Navigation emphasis text</b></nav>\
            </body></html>";
        let filtered = extractor().smart_filter(raw);
        assert_eq!(filtered.tables, vec!["Revenue 100"]);
        assert_eq!(filtered.emphases, vec!["Important emphasised note"]);
        assert!(!filtered.full.contains("Navigation"));
    }

    #[test]
    fn test_prepare_appends_sections_and_date() {
        let raw = "<SEC-HEADER>FILED AS OF DATE: 20250726</SEC-HEADER>\
            <html><body><table><tr><td>Dividend</td><td>$0.25</td></tr></table>\
            <strong>Board declared a dividend</strong></body></html>";
        let prepared = extractor().prepare(raw);
        assert_eq!(prepared.filing_date, NaiveDate::from_ymd_opt(2025, 7, 26).unwrap());
        assert!(prepared.content.contains("\n\n[테이블]\nDividend $0.25"));
        assert!(prepared.content.contains("\n\n[강조]\nBoard declared a dividend"));
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
