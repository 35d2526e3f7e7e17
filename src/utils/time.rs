//! 韓國標準時間 (KST, UTC+09:00, 無日光節約) 相關工具。
//! 所有排程、查詢範圍與寫入時間戳都以 KST 計算。

use crate::utils::error::Result;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};

const KST_OFFSET_SECS: i32 = 9 * 3600;

pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("UTC+09:00 is a valid offset")
}

pub fn now_kst() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&kst())
}

pub fn today_kst() -> NaiveDate {
    now_kst().date_naive()
}

/// DB 寫入用的 KST naive 時間戳
pub fn now_kst_naive() -> NaiveDateTime {
    now_kst().naive_local()
}

/// `[當天 00:00, 隔天 00:00)`
pub fn kst_day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(chrono::NaiveTime::MIN);
    (start, start + Duration::days(1))
}

/// Yahoo 的 `pubDate` (例如 `2025-07-26T13:05:00Z`) 轉成 KST 字串
pub fn utc_iso_to_kst_string(value: &str) -> Result<String> {
    let normalized = match value.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => value.to_string(),
    };
    let parsed = DateTime::parse_from_rfc3339(&normalized)?;
    Ok(parsed
        .with_timezone(&kst())
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string())
}

/// 例如 `2025년 7월 6일`
pub fn korean_date(date: NaiveDate) -> String {
    format!("{}년 {}월 {}일", date.year(), date.month(), date.day())
}
