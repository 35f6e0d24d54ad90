//! 申请人信息与平台凭据
//!
//! 两者都由外部提供、只读使用；凭据不落盘、不进日志

use serde::Deserialize;

use crate::models::platform::Platform;

/// 平台登录凭据
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// 从环境变量 `<平台>_USERNAME` / `<平台>_PASSWORD` 读取，缺一项返回 None
    pub fn from_env(platform: Platform) -> Option<Self> {
        let prefix = platform.as_str().to_ascii_uppercase();
        let username = std::env::var(format!("{}_USERNAME", prefix)).ok()?;
        let password = std::env::var(format!("{}_PASSWORD", prefix)).ok()?;
        if username.trim().is_empty() || password.is_empty() {
            return None;
        }
        Some(Self::new(username, password))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 申请人基础资料，用于填写表单中的常规字段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplicantProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin_url: String,
    pub portfolio_url: String,
    pub years_experience: Option<u32>,
    pub work_authorized: Option<bool>,
    pub requires_sponsorship: Option<bool>,
}

impl ApplicantProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}
