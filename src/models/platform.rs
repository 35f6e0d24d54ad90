use serde::{Deserialize, Serialize};

/// 招聘平台枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LinkedIn,
    Indeed,
    Glassdoor,
    Wellfound,
}

impl Platform {
    /// 全部已支持的平台
    pub const ALL: [Platform; 4] = [
        Platform::LinkedIn,
        Platform::Indeed,
        Platform::Glassdoor,
        Platform::Wellfound,
    ];

    /// 标准名称（同时用作岗位 ID 前缀）
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::LinkedIn => "linkedin",
            Platform::Indeed => "indeed",
            Platform::Glassdoor => "glassdoor",
            Platform::Wellfound => "wellfound",
        }
    }

    /// 从字符串解析平台（忽略大小写）
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linkedin" | "li" => Some(Platform::LinkedIn),
            "indeed" => Some(Platform::Indeed),
            "glassdoor" | "gd" => Some(Platform::Glassdoor),
            "wellfound" | "angellist" | "angel" => Some(Platform::Wellfound),
            _ => None,
        }
    }

    /// 平台自身的主机名后缀，用来判断当前页是否仍在平台内
    pub fn host_suffixes(self) -> &'static [&'static str] {
        match self {
            Platform::LinkedIn => &["linkedin.com"],
            Platform::Indeed => &["indeed.com"],
            Platform::Glassdoor => &["glassdoor.com", "glassdoor.co.uk"],
            Platform::Wellfound => &["wellfound.com", "angel.co"],
        }
    }

    /// 生成带平台前缀的岗位 ID
    pub fn qualify_id(self, raw_id: &str) -> String {
        format!("{}:{}", self.as_str(), raw_id.trim())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
