use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};
use crate::models::{ApplicantProfile, Platform};
use crate::services::JobFilter;

/// 单个浏览器会话的配置
///
/// 在会话创建时提供；运行中只能通过显式的重新配置调用修改
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScraperSessionConfig {
    /// 是否无头运行
    pub headless: bool,
    /// 两次请求的最小间隔（毫秒）
    pub throttle_min_delay_ms: u64,
    /// 两次请求的最大间隔（毫秒），与最小值之差作为随机抖动上限
    pub throttle_max_delay_ms: u64,
    /// 滑动窗口内允许的请求数
    pub requests_per_window: usize,
    /// 滑动窗口长度（毫秒）
    pub window_ms: u64,
    /// 单次抓取最多返回的岗位数
    pub max_results: usize,
    /// 单次导航 / 元素等待超时（毫秒）
    pub timeout_ms: u64,
    pub user_agent: String,
    pub locale: String,
    pub timezone: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// 浏览器可执行文件路径，不填则由 chromiumoxide 自动查找
    pub chrome_executable: Option<PathBuf>,
    /// 填写后连接到已在运行的浏览器（复用登录态），而不是启动新实例
    pub browser_debug_port: Option<u16>,
    /// 翻页上限，防止平台分页死循环
    pub max_pages: usize,
}

impl Default for ScraperSessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            throttle_min_delay_ms: 2_000,
            throttle_max_delay_ms: 5_000,
            requests_per_window: 20,
            window_ms: 60_000,
            max_results: 100,
            timeout_ms: 30_000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            locale: "en-US".to_string(),
            timezone: "America/New_York".to_string(),
            viewport_width: 1366,
            viewport_height: 768,
            chrome_executable: None,
            browser_debug_port: None,
            max_pages: 50,
        }
    }
}

impl ScraperSessionConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            headless: env_or("HEADLESS", default.headless),
            throttle_min_delay_ms: env_or("THROTTLE_MIN_DELAY_MS", default.throttle_min_delay_ms),
            throttle_max_delay_ms: env_or("THROTTLE_MAX_DELAY_MS", default.throttle_max_delay_ms),
            requests_per_window: env_or("REQUESTS_PER_WINDOW", default.requests_per_window),
            window_ms: env_or("WINDOW_MS", default.window_ms),
            max_results: env_or("MAX_RESULTS", default.max_results),
            timeout_ms: env_or("TIMEOUT_MS", default.timeout_ms),
            user_agent: std::env::var("USER_AGENT").unwrap_or(default.user_agent),
            locale: std::env::var("BROWSER_LOCALE").unwrap_or(default.locale),
            timezone: std::env::var("BROWSER_TIMEZONE").unwrap_or(default.timezone),
            viewport_width: env_or("VIEWPORT_WIDTH", default.viewport_width),
            viewport_height: env_or("VIEWPORT_HEIGHT", default.viewport_height),
            chrome_executable: std::env::var("CHROME_EXECUTABLE")
                .ok()
                .map(PathBuf::from)
                .or(default.chrome_executable),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(default.browser_debug_port),
            max_pages: env_or("MAX_PAGES", default.max_pages),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 校验取值范围
    pub fn validate(&self) -> AppResult<()> {
        if self.throttle_min_delay_ms > self.throttle_max_delay_ms {
            return Err(AppError::invalid_config(
                "throttle_min_delay_ms",
                format!(
                    "最小间隔 {} 大于最大间隔 {}",
                    self.throttle_min_delay_ms, self.throttle_max_delay_ms
                ),
            ));
        }
        if self.requests_per_window == 0 {
            return Err(AppError::invalid_config("requests_per_window", "必须大于 0"));
        }
        if self.window_ms == 0 {
            return Err(AppError::invalid_config("window_ms", "必须大于 0"));
        }
        if self.max_results == 0 {
            return Err(AppError::invalid_config("max_results", "必须大于 0"));
        }
        if self.max_pages == 0 {
            return Err(AppError::invalid_config("max_pages", "必须大于 0"));
        }
        Ok(())
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: ScraperSessionConfig,
    /// 只走到审核页、不真正提交
    pub dry_run: bool,
    /// 同时进行的申请数量
    pub max_concurrent_attempts: usize,
    /// 单次申请的整体期限（秒）
    pub attempt_deadline_secs: u64,
    pub login_timeout_ms: u64,
    /// 提交后等待确认页的时长（毫秒）
    pub confirmation_wait_ms: u64,
    /// 表单步骤上限
    pub step_limit: usize,
    /// 状态事件 JSONL 文件
    pub status_log_file: String,
    /// 状态事件 webhook（可选）
    pub status_webhook_url: Option<String>,
    /// 岗位导出目录
    pub export_dir: String,
    /// 定制内容所在目录
    pub tailored_folder: String,
    /// 临时简历文件目录
    pub resume_temp_dir: PathBuf,
    /// 跨平台去重时的平台优先级，靠前者优先
    pub platform_priority: Vec<Platform>,
    /// 抓取结果的二次筛选（职位 / 地区 / 最低薪资）
    pub filter: JobFilter,
    /// 申请人资料，用于填写表单常规字段
    pub profile: ApplicantProfile,
    /// 主简历（Markdown），抓取结果按其中 `## SKILLS` 的命中数排序；不填则不排序
    pub master_resume: Option<PathBuf>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

/// 表单步骤的硬上限
pub const MAX_FORM_STEPS: usize = 10;

impl Default for Config {
    fn default() -> Self {
        Self {
            session: ScraperSessionConfig::default(),
            dry_run: true,
            max_concurrent_attempts: 2,
            attempt_deadline_secs: 600,
            login_timeout_ms: 60_000,
            confirmation_wait_ms: 15_000,
            step_limit: MAX_FORM_STEPS,
            status_log_file: "application_status.jsonl".to_string(),
            status_webhook_url: None,
            export_dir: "exports".to_string(),
            tailored_folder: "tailored".to_string(),
            resume_temp_dir: std::env::temp_dir(),
            platform_priority: Platform::ALL.to_vec(),
            filter: JobFilter::default(),
            profile: ApplicantProfile::default(),
            master_resume: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            session: ScraperSessionConfig::from_env(),
            dry_run: env_or("DRY_RUN", default.dry_run),
            max_concurrent_attempts: env_or("MAX_CONCURRENT_ATTEMPTS", default.max_concurrent_attempts),
            attempt_deadline_secs: env_or("ATTEMPT_DEADLINE_SECS", default.attempt_deadline_secs),
            login_timeout_ms: env_or("LOGIN_TIMEOUT_MS", default.login_timeout_ms),
            confirmation_wait_ms: env_or("CONFIRMATION_WAIT_MS", default.confirmation_wait_ms),
            step_limit: env_or("STEP_LIMIT", default.step_limit),
            status_log_file: std::env::var("STATUS_LOG_FILE").unwrap_or(default.status_log_file),
            status_webhook_url: std::env::var("STATUS_WEBHOOK_URL").ok().or(default.status_webhook_url),
            export_dir: std::env::var("EXPORT_DIR").unwrap_or(default.export_dir),
            tailored_folder: std::env::var("TAILORED_FOLDER").unwrap_or(default.tailored_folder),
            resume_temp_dir: std::env::var("RESUME_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.resume_temp_dir),
            platform_priority: std::env::var("PLATFORM_PRIORITY")
                .ok()
                .map(|v| parse_priority(&v))
                .filter(|p| !p.is_empty())
                .unwrap_or(default.platform_priority),
            filter: default.filter,
            profile: default.profile,
            master_resume: std::env::var("MASTER_RESUME")
                .ok()
                .map(PathBuf::from)
                .or(default.master_resume),
            verbose_logging: env_or("VERBOSE_LOGGING", default.verbose_logging),
        }
    }

    /// 从 TOML 文件加载，缺省项取默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            AppError::Config(ConfigError::FileParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.session.validate()?;
        if self.max_concurrent_attempts == 0 {
            return Err(AppError::invalid_config("max_concurrent_attempts", "必须大于 0"));
        }
        if self.step_limit == 0 || self.step_limit > MAX_FORM_STEPS {
            return Err(AppError::invalid_config(
                "step_limit",
                format!("必须在 1..={} 之间", MAX_FORM_STEPS),
            ));
        }
        Ok(())
    }

    pub fn attempt_deadline(&self) -> Duration {
        Duration::from_secs(self.attempt_deadline_secs)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_priority(value: &str) -> Vec<Platform> {
    value.split(',').filter_map(Platform::from_name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.dry_run);
        assert_eq!(config.step_limit, MAX_FORM_STEPS);
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let session = ScraperSessionConfig {
            throttle_min_delay_ms: 10,
            throttle_max_delay_ms: 5,
            ..Default::default()
        };
        assert!(session.validate().is_err());
    }

    #[test]
    fn test_toml_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            dry_run = false
            platform_priority = ["indeed", "linkedin"]
            master_resume = "resume/master.md"

            [filter]
            titles = ["rust"]
            min_compensation = 120000.0

            [profile]
            first_name = "Ada"
            work_authorized = true

            [session]
            max_results = 25
            headless = false
            "#,
        )
        .unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.session.max_results, 25);
        assert!(!config.session.headless);
        assert_eq!(config.session.requests_per_window, 20);
        assert_eq!(config.platform_priority, vec![Platform::Indeed, Platform::LinkedIn]);
        assert_eq!(config.filter.titles, vec!["rust".to_string()]);
        assert_eq!(config.filter.min_compensation, Some(120_000.0));
        assert!(config.filter.geos.is_empty());
        assert_eq!(config.profile.first_name, "Ada");
        assert_eq!(config.profile.work_authorized, Some(true));
        assert_eq!(config.master_resume, Some(PathBuf::from("resume/master.md")));
    }

    #[test]
    fn test_parse_priority_skips_unknown() {
        assert_eq!(
            parse_priority("glassdoor, monster ,linkedin"),
            vec![Platform::Glassdoor, Platform::LinkedIn]
        );
    }
}
