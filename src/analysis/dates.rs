use crate::analysis::sanitize::{parse_document, sanitize_markup, visible_text};
use crate::utils::time::today_kst;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static HEADER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)CONFORMED\s+PERIOD\s+OF\s+REPORT[:\s]+(\d{8})",
        r"(?i)FILED\s+AS\s+OF\s+DATE[:\s]+(\d{8})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static HEADER_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<SEC-HEADER>.*?</SEC-HEADER>").unwrap());

static TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)date\s+of\s+report\s*[:\(]?\s*(\w+\s+\d{1,2},?\s+\d{4})",
        r"(?i)date\s+of\s+earliest\s+event\s+reported\s*[:\(]?\s*(\w+\s+\d{1,2},?\s+\d{4})",
        r"(?i)filing\s+date\s*[:\(]?\s*(\w+\s+\d{1,2},?\s+\d{4})",
        r"(\d{4}-\d{2}-\d{2})",
        r"(\d{1,2}/\d{1,2}/\d{4})",
        r"(\d{1,2}-\d{1,2}-\d{4})",
        r"\((\w+\s+\d{1,2},?\s+\d{4})\)",
        r"\((\d{1,2}/\d{1,2}/\d{4})\)",
        r"\((\d{4}-\d{2}-\d{2})\)",
        r"(?i)(?:on|dated?|as\s+of|effective)\s+(\w+\s+\d{1,2},?\s+\d{4})",
        r"(?i)(?:on|dated?|as\s+of|effective)\s+(\d{1,2}/\d{1,2}/\d{4})",
        r"(?i)current\s+report\s+.*?(\w+\s+\d{1,2},?\s+\d{4})",
        r"(?i)form\s+8-k\s+.*?(\w+\s+\d{1,2},?\s+\d{4})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static DATE_TAGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time, date, span, div, p").unwrap());

const DATE_FORMATS: [&str; 9] = [
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
];

const DATE_ATTRIBUTES: [&str; 3] = ["datetime", "date", "data-date"];

/// 8-K 公告日期擷取。依序嘗試 SEC header、文字樣式、HTML 標籤，都失敗就用預設日期。
#[derive(Debug, Clone)]
pub struct FilingDateExtractor {
    default_date: NaiveDate,
}

impl FilingDateExtractor {
    pub fn new(default_date: NaiveDate) -> Self {
        Self { default_date }
    }

    /// 把各種寫法正規化成日期；年份需落在 1990 ~ 今年+5
    pub fn normalize(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
            return NaiveDate::parse_from_str(value, "%Y%m%d").ok();
        }

        let max_year = today_kst().year() + 5;
        DATE_FORMATS.iter().find_map(|fmt| {
            NaiveDate::parse_from_str(value, fmt)
                .ok()
                .filter(|d| (1990..=max_year).contains(&d.year()))
        })
    }

    pub fn from_sec_header(raw: &str) -> Option<NaiveDate> {
        for pattern in HEADER_PATTERNS.iter() {
            for caps in pattern.captures_iter(raw) {
                if let Some(date) = Self::normalize(&caps[1]) {
                    return Some(date);
                }
            }
        }

        HEADER_BLOCK
            .find(raw)
            .and_then(|block| Self::from_patterns(block.as_str()))
    }

    pub fn from_patterns(text: &str) -> Option<NaiveDate> {
        TEXT_PATTERNS.iter().find_map(|pattern| {
            pattern
                .captures_iter(text)
                .find_map(|caps| Self::normalize(&caps[1]))
        })
    }

    pub fn from_tags(html: &Html) -> Option<NaiveDate> {
        for element in html.select(&DATE_TAGS) {
            for attribute in DATE_ATTRIBUTES {
                if let Some(date) = element.value().attr(attribute).and_then(Self::normalize) {
                    return Some(date);
                }
            }
            if let Some(date) = own_string(element).and_then(Self::normalize) {
                return Some(date);
            }
        }
        None
    }

    /// `sanitized` 為清理過的原文，`html` / `text` 為同一份文件的解析結果
    pub fn extract_parsed(&self, sanitized: &str, html: &Html, text: &str) -> NaiveDate {
        Self::from_sec_header(sanitized)
            .or_else(|| Self::from_patterns(text))
            .or_else(|| Self::from_tags(html))
            .unwrap_or(self.default_date)
    }

    pub fn extract(&self, raw: &str) -> NaiveDate {
        let sanitized = sanitize_markup(raw.as_bytes());
        let html = parse_document(&sanitized);
        let text = visible_text(html.root_element(), " ");
        self.extract_parsed(&sanitized, &html, &text)
    }
}

/// 只有單一文字子節點的元素才取其文字
fn own_string(element: ElementRef<'_>) -> Option<&str> {
    let mut children = element.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }
    only.value().as_text().map(|t| &**t)
}
