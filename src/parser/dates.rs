//! 发布时间解析
//!
//! 列表页上的发布时间大多是相对写法（`3 days ago`、`2w`、`Just posted`、`30d+`），
//! 少数给出 `datetime` 属性里的 ISO 日期。

use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;

fn relative_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?P<n>\d+)\s*\+?\s*(?P<unit>minutes?|mins?|m|hours?|hrs?|h|days?|d|weeks?|wks?|w|months?|mos?|years?|yrs?|y)\b\+?",
        )
        .ok()
    })
    .as_ref()
}

/// 解析发布时间，`now` 作为相对时间的基准；无法识别时返回 None
pub fn parse_posted(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    let lower = trimmed.to_lowercase();
    if ["just posted", "just now", "today", "moments ago", "few hours ago"]
        .iter()
        .any(|marker| lower.contains(marker))
    {
        return Some(now);
    }
    if lower.contains("yesterday") {
        return Some(now - Duration::days(1));
    }

    let cap = relative_re()?.captures(&lower)?;
    let n: i64 = cap.name("n")?.as_str().parse().ok()?;
    let unit = cap.name("unit")?.as_str();
    let offset = match unit.chars().next()? {
        'h' => Duration::hours(n),
        'd' => Duration::days(n),
        'w' => Duration::weeks(n),
        'y' => Duration::days(365 * n),
        'm' if unit.starts_with("mo") => Duration::days(30 * n),
        'm' => Duration::minutes(n),
        _ => return None,
    };
    Some(now - offset)
}
