use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::platform::Platform;

/// 解析后的薪资区间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
    /// 计薪周期（year / month / week / day / hour）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

/// 招聘岗位
///
/// `id` 带平台前缀，重复抓取时保持稳定；`id` 与 `url` 在发出时一定非空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    /// 原始薪资文本
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<SalaryRange>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
}

impl JobPosting {
    /// 是否满足发出条件
    pub fn is_emittable(&self) -> bool {
        !self.id.trim().is_empty() && !self.url.trim().is_empty()
    }

    /// 公司 + 职位的归一化键，用于跨平台去重
    pub fn company_title_key(&self) -> String {
        fn norm(s: &str) -> String {
            s.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        }
        format!("{}|{}", norm(&self.company), norm(&self.title))
    }
}

/// 发布时间过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatePosted {
    LastDay,
    LastWeek,
    LastMonth,
}

impl DatePosted {
    pub fn days(self) -> u32 {
        match self {
            DatePosted::LastDay => 1,
            DatePosted::LastWeek => 7,
            DatePosted::LastMonth => 30,
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-day" | "day" | "24h" => Some(DatePosted::LastDay),
            "last-week" | "week" => Some(DatePosted::LastWeek),
            "last-month" | "month" => Some(DatePosted::LastMonth),
            _ => None,
        }
    }
}

/// 资历级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Internship,
    Entry,
    Associate,
    Mid,
    Senior,
    Director,
    Executive,
}

/// 搜索条件，一次抓取内不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub keywords: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub salary_min: Option<u32>,
    #[serde(default)]
    pub salary_max: Option<u32>,
    #[serde(default)]
    pub date_posted: Option<DatePosted>,
    #[serde(default)]
    pub seniority: Option<Seniority>,
}

impl SearchFilters {
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            location: None,
            remote: false,
            salary_min: None,
            salary_max: None,
            date_posted: None,
            seniority: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_date_posted(mut self, date_posted: DatePosted) -> Self {
        self.date_posted = Some(date_posted);
        self
    }

    pub fn with_salary_min(mut self, salary_min: u32) -> Self {
        self.salary_min = Some(salary_min);
        self
    }

    pub fn with_seniority(mut self, seniority: Seniority) -> Self {
        self.seniority = Some(seniority);
        self
    }
}
