//! 薪资文本解析
//!
//! 支持 `$120,000 - $150,000 a year`、`€60K–€80K`、`$45/hr`、`From $90,000`、`Up to £50k` 等写法

use std::sync::OnceLock;

use regex::Regex;

use crate::models::SalaryRange;

fn amount_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?P<cur>[$€£₹]|usd|eur|gbp|cad|aud|inr)?\s*(?P<num>\d[\d,]*(?:\.\d+)?)\s*(?P<k>k)?\b").ok()
    })
    .as_ref()
}

fn period_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\bper|\ban?|/|\beach)\s*(?P<p>year|yr|annum|month|mo|week|wk|day|hour|hr)\b").ok()
    })
    .as_ref()
}

/// 解析薪资文本；没有数字时返回 None
pub fn parse_salary(text: &str) -> Option<SalaryRange> {
    let lower = text.to_lowercase();
    let mut currency: Option<String> = None;
    let mut amounts: Vec<f64> = Vec::new();

    for cap in amount_re()?.captures_iter(text) {
        let Some(num) = cap.name("num") else {
            continue;
        };
        let Ok(mut value) = num.as_str().replace(',', "").parse::<f64>() else {
            continue;
        };
        if cap.name("k").is_some() {
            value *= 1_000.0;
        }
        if currency.is_none() {
            currency = cap.name("cur").map(|c| normalize_currency(c.as_str()));
        }
        amounts.push(value);
        if amounts.len() == 2 {
            break;
        }
    }

    if amounts.is_empty() {
        return None;
    }

    let period = period_re()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.name("p"))
        .map(|p| normalize_period(p.as_str()).to_string());

    let (min, max) = match amounts.as_slice() {
        [single] if lower.contains("up to") => (None, Some(*single)),
        [single] if lower.contains("from") || lower.contains('+') => (Some(*single), None),
        [single] => (Some(*single), Some(*single)),
        [a, b, ..] => (Some(a.min(*b)), Some(a.max(*b))),
        [] => (None, None),
    };

    Some(SalaryRange {
        min,
        max,
        currency,
        period,
    })
}

fn normalize_currency(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "$" | "usd" => "USD",
        "€" | "eur" => "EUR",
        "£" | "gbp" => "GBP",
        "₹" | "inr" => "INR",
        "cad" => "CAD",
        "aud" => "AUD",
        _ => "USD",
    }
    .to_string()
}

fn normalize_period(raw: &str) -> &'static str {
    match raw.to_lowercase().as_str() {
        "year" | "yr" | "annum" => "year",
        "month" | "mo" => "month",
        "week" | "wk" => "week",
        "day" => "day",
        _ => "hour",
    }
}
