use crate::utils::error::DigestError;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 排程設定，字串格式：
/// - `"03:00"`：每天 KST 03:00
/// - `"every 5m"` / `"every 30s"` / `"every 2h"`：固定間隔
/// - `"startup"`：程式啟動時跑一次
/// - `"off"`：停用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum JobSchedule {
    Daily { hour: u32, minute: u32 },
    Every(Duration),
    OnStartup,
    Disabled,
}

impl JobSchedule {
    pub const fn daily(hour: u32, minute: u32) -> Self {
        Self::Daily { hour, minute }
    }

    /// 下一次觸發時間 (嚴格晚於 `now`)；`OnStartup` / `Disabled` 沒有週期觸發
    pub fn next_fire_after(&self, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        match *self {
            Self::Daily { hour, minute } => {
                let at = NaiveTime::from_hms_opt(hour, minute, 0)?;
                let today = now.date_naive().and_time(at);
                let candidate = now.timezone().from_local_datetime(&today).single()?;
                if candidate > now {
                    Some(candidate)
                } else {
                    Some(candidate + ChronoDuration::days(1))
                }
            }
            Self::Every(interval) => {
                Some(now + ChronoDuration::from_std(interval).ok()?)
            }
            Self::OnStartup | Self::Disabled => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl FromStr for JobSchedule {
    type Err = DigestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        let invalid = |reason: &str| DigestError::InvalidConfigValueError {
            field: "schedule".to_string(),
            value: value.clone(),
            reason: reason.to_string(),
        };

        match value.as_str() {
            "off" | "disabled" | "never" => return Ok(Self::Disabled),
            "startup" | "on_startup" => return Ok(Self::OnStartup),
            _ => {}
        }

        if let Some(spec) = value.strip_prefix("every") {
            let spec = spec.trim();
            let Some((split, _)) = spec.char_indices().last().filter(|(idx, _)| *idx > 0) else {
                return Err(invalid("expected an interval like `every 5m`"));
            };
            let (amount, unit) = spec.split_at(split);
            let amount: u64 = amount
                .trim()
                .parse()
                .map_err(|_| invalid("interval amount must be a positive integer"))?;
            if amount == 0 {
                return Err(invalid("interval must be greater than zero"));
            }
            let multiplier = match unit {
                "s" => 1,
                "m" => 60,
                "h" => 3600,
                _ => return Err(invalid("interval unit must be s, m or h")),
            };
            let interval = amount
                .checked_mul(multiplier)
                .map(Duration::from_secs)
                .filter(|d| ChronoDuration::from_std(*d).is_ok())
                .ok_or_else(|| invalid("interval is too large"))?;
            return Ok(Self::Every(interval));
        }

        let (hour, minute) = value
            .split_once(':')
            .ok_or_else(|| invalid("expected HH:MM, `every <n><s|m|h>`, `startup` or `off`"))?;
        let hour: u32 = hour.parse().map_err(|_| invalid("hour is not a number"))?;
        let minute: u32 = minute.parse().map_err(|_| invalid("minute is not a number"))?;
        if hour > 23 || minute > 59 {
            return Err(invalid("time of day out of range"));
        }
        Ok(Self::Daily { hour, minute })
    }
}

impl TryFrom<String> for JobSchedule {
    type Error = DigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JobSchedule> for String {
    fn from(value: JobSchedule) -> Self {
        value.to_string()
    }
}

impl fmt::Display for JobSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { hour, minute } => write!(f, "{:02}:{:02}", hour, minute),
            Self::Every(interval) => {
                let secs = interval.as_secs();
                if secs % 3600 == 0 {
                    write!(f, "every {}h", secs / 3600)
                } else if secs % 60 == 0 {
                    write!(f, "every {}m", secs / 60)
                } else {
                    write!(f, "every {}s", secs)
                }
            }
            Self::OnStartup => write!(f, "startup"),
            Self::Disabled => write!(f, "off"),
        }
    }
}
