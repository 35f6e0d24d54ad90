//! 集成测试用的脚本化会话与适配器
//!
//! 不启动浏览器：会话只记录调用，适配器按脚本返回结果

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use job_autopilot::browser::{ElementHandle, Locator, Session};
use job_autopilot::error::AppResult;
use job_autopilot::infrastructure::{SharedThrottle, ThrottleConfig, ThrottleManager};
use job_autopilot::models::{
    Credentials, DetectedField, InputType, JobPosting, Platform, ResumePayload, SearchFilters,
    TailoredOutput,
};
use job_autopilot::platforms::PlatformAdapter;

/// 不等待的节流器
pub fn instant_throttle() -> SharedThrottle {
    ThrottleManager::with_seed(
        ThrottleConfig {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            requests_per_window: 10_000,
            window: Duration::from_secs(1),
        },
        1,
    )
    .shared()
}

pub fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("job_autopilot_it_{}_{}", name, uuid::Uuid::new_v4()))
}

pub fn posting(platform: Platform, raw_id: &str) -> JobPosting {
    JobPosting {
        id: platform.qualify_id(raw_id),
        title: format!("Engineer {}", raw_id),
        company: format!("Company {}", raw_id),
        location: "Remote".to_string(),
        description: String::new(),
        url: format!("https://www.linkedin.com/jobs/view/{}", raw_id),
        salary: None,
        salary_range: None,
        tags: BTreeSet::new(),
        platform,
        posted_at: None,
        scraped_at: Utc::now(),
    }
}

pub fn tailored(job_id: &str) -> TailoredOutput {
    TailoredOutput {
        job_id: job_id.to_string(),
        tailored_resume: ResumePayload::Text("## SKILLS\n- Rust, Tokio\n".to_string()),
        cover_letter: Some("Dear hiring team".to_string()),
        outreach_message: None,
        confidence_score: 0.9,
    }
}

// ---------------------------------------------------------------------------
// 会话
// ---------------------------------------------------------------------------

/// 只记录调用次数的会话
#[derive(Default)]
pub struct ScriptedSession {
    pub navigate_ok: bool,
    pub initialized: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
    pub closed: AtomicUsize,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self {
            navigate_ok: true,
            ..Default::default()
        }
    }

    pub fn failing_navigation() -> Self {
        Self {
            navigate_ok: false,
            ..Default::default()
        }
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn initialize(&mut self) -> AppResult<()> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn new_page(&mut self) -> AppResult<()> {
        Ok(())
    }

    async fn navigate(&self, url: &str, _timeout: Duration) -> bool {
        self.navigations.lock().unwrap().push(url.to_string());
        self.navigate_ok
    }

    async fn locate(&self, locators: &[Locator]) -> Option<ElementHandle> {
        locators
            .first()
            .map(|l| ElementHandle::new(l.to_string(), l.clone()))
    }

    async fn read_texts(&self, _locators: &[Locator]) -> Vec<String> {
        Vec::new()
    }

    async fn click(&self, _handle: &ElementHandle) -> bool {
        true
    }

    async fn fill(&self, _handle: &ElementHandle, _value: &str) -> bool {
        true
    }

    async fn select_option(&self, _handle: &ElementHandle, _option: &str) -> bool {
        true
    }

    async fn set_checked(&self, _handle: &ElementHandle, _checked: bool) -> bool {
        true
    }

    async fn upload_file(&self, _handle: &ElementHandle, _path: &Path) -> bool {
        true
    }

    async fn wait_visible(&self, _handle: &ElementHandle, _timeout: Duration) -> bool {
        true
    }

    async fn is_enabled(&self, _handle: &ElementHandle) -> bool {
        true
    }

    async fn content(&self) -> Option<String> {
        Some("<html><body>scripted</body></html>".to_string())
    }

    async fn form_snapshot(&self) -> Option<String> {
        self.content().await
    }

    async fn current_url(&self) -> Option<String> {
        self.navigations.lock().unwrap().last().cloned()
    }

    async fn title(&self) -> Option<String> {
        Some("Scripted".to_string())
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// 适配器脚本
// ---------------------------------------------------------------------------

/// 申请表单脚本
#[derive(Debug, Clone)]
pub struct FormScript {
    pub external: bool,
    pub form_present: bool,
    /// 出现提交按钮前的步数（提交按钮在最后一步出现）
    pub steps: usize,
    /// 永远只有"下一步"
    pub endless: bool,
    /// 在第几步报表单错误
    pub errors_at_step: Option<usize>,
    pub confirms: bool,
    pub submit_enabled: bool,
    pub panic_on_fields: bool,
    /// detect_application_form 卡住不返回
    pub hang_on_form: bool,
    /// is_logged_in 的返回值
    pub logged_in: bool,
    /// 在第几步没有"下一步"按钮
    pub no_next_at_step: Option<usize>,
    /// 在第几步出现验证码
    pub block_at_step: Option<usize>,
}

impl Default for FormScript {
    fn default() -> Self {
        Self {
            external: false,
            form_present: true,
            steps: 3,
            endless: false,
            errors_at_step: None,
            confirms: true,
            submit_enabled: true,
            panic_on_fields: false,
            hang_on_form: false,
            logged_in: true,
            no_next_at_step: None,
            block_at_step: None,
        }
    }
}

/// 适配器调用记录
#[derive(Debug, Default)]
pub struct Calls {
    pub fills: Vec<(String, String)>,
    /// 上传时文件是否存在
    pub uploads: Vec<(PathBuf, bool)>,
    pub next_clicks: usize,
    pub submits: usize,
    pub step: usize,
    pub submitted: bool,
    pub logins: usize,
    // 抓取
    pub page: usize,
    pub parse_calls: usize,
}

/// 按脚本行事的适配器
pub struct ScriptedAdapter {
    pub form: FormScript,
    /// 每一页的岗位数；页内 ID 为 p{page}-{i}
    pub pages: Vec<usize>,
    /// 第二页起是否重复上一页的 ID
    pub repeat_ids: bool,
    /// 在哪一页（从 0 开始）解析时 panic
    pub panic_on_page: Option<usize>,
    /// 翻到哪一页时失败
    pub fail_advance_to: Option<usize>,
    /// 在哪一页（从 0 开始）出现验证码
    pub block_on_page: Option<usize>,
    pub calls: Mutex<Calls>,
}

impl ScriptedAdapter {
    pub fn with_form(form: FormScript) -> Arc<Self> {
        Arc::new(Self {
            form,
            pages: Vec::new(),
            repeat_ids: false,
            panic_on_page: None,
            fail_advance_to: None,
            block_on_page: None,
            calls: Mutex::new(Calls::default()),
        })
    }

    pub fn with_pages(pages: Vec<usize>) -> Self {
        Self {
            form: FormScript::default(),
            pages,
            repeat_ids: false,
            panic_on_page: None,
            fail_advance_to: None,
            block_on_page: None,
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }

    fn field(id: &str, label: &str, input_type: InputType) -> DetectedField {
        DetectedField {
            id: id.to_string(),
            name: None,
            label: label.to_string(),
            input_type,
            options: Vec::new(),
            required: true,
            filled: false,
            selector: format!("[id=\"{}\"]", id),
        }
    }
}

#[async_trait]
impl PlatformAdapter for ScriptedAdapter {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn build_search_url(&self, filters: &SearchFilters) -> AppResult<String> {
        Ok(format!("https://www.linkedin.com/jobs/search/?keywords={}", filters.keywords))
    }

    fn parse_result_page(&self, _html: &str, scraped_at: DateTime<Utc>) -> Vec<JobPosting> {
        let page = {
            let mut calls = self.calls();
            calls.parse_calls += 1;
            calls.page
        };
        if self.panic_on_page == Some(page) {
            panic!("selector engine exploded on page {}", page);
        }
        let id_page = if self.repeat_ids && page > 0 { page - 1 } else { page };
        let count = self.pages.get(page).copied().unwrap_or(0);
        (0..count)
            .map(|i| {
                let mut p = posting(Platform::LinkedIn, &format!("p{}-{}", id_page, i));
                p.scraped_at = scraped_at;
                p
            })
            .collect()
    }

    fn has_next_page(&self, _html: &str) -> bool {
        self.calls().page + 1 < self.pages.len()
    }

    async fn advance_page(&self, _session: &dyn Session) -> bool {
        let mut calls = self.calls();
        if self.fail_advance_to == Some(calls.page + 1) {
            return false;
        }
        calls.page += 1;
        true
    }

    async fn login(&self, _session: &dyn Session, _credentials: &Credentials) -> bool {
        self.calls().logins += 1;
        true
    }

    async fn is_logged_in(&self, _session: &dyn Session) -> bool {
        self.form.logged_in
    }

    async fn is_on_platform(&self, _session: &dyn Session) -> bool {
        !self.form.external
    }

    async fn open_application(&self, _session: &dyn Session) -> bool {
        true
    }

    async fn detect_application_form(&self, _session: &dyn Session) -> bool {
        if self.form.hang_on_form {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        self.form.form_present
    }

    async fn is_external_redirect(&self, _session: &dyn Session) -> bool {
        self.form.external
    }

    async fn external_target(&self, _session: &dyn Session) -> Option<String> {
        self.form
            .external
            .then(|| "external ATS Lever (https://jobs.lever.co/acme/1)".to_string())
    }

    async fn detect_fields(&self, _session: &dyn Session) -> Vec<DetectedField> {
        if self.form.panic_on_fields {
            panic!("field detection exploded");
        }
        match self.calls().step {
            0 => vec![
                Self::field("resume", "Resume", InputType::File),
                Self::field("first_name", "First name", InputType::Text),
            ],
            1 => vec![Self::field("cover", "Cover letter", InputType::Textarea)],
            _ => vec![Self::field("email", "Email", InputType::Text)],
        }
    }

    async fn fill_field(&self, _session: &dyn Session, field: &DetectedField, value: &str) -> bool {
        self.calls().fills.push((field.label.clone(), value.to_string()));
        true
    }

    async fn upload_resume(&self, _session: &dyn Session, path: &Path) -> bool {
        self.calls().uploads.push((path.to_path_buf(), path.exists()));
        true
    }

    async fn has_submit_control(&self, _session: &dyn Session) -> bool {
        !self.form.endless && self.calls().step + 1 >= self.form.steps
    }

    async fn has_next_control(&self, _session: &dyn Session) -> bool {
        self.form.no_next_at_step != Some(self.calls().step)
    }

    async fn navigate_to_next_step(&self, _session: &dyn Session) -> bool {
        let mut calls = self.calls();
        calls.next_clicks += 1;
        calls.step += 1;
        true
    }

    async fn submit_application(&self, _session: &dyn Session) -> bool {
        let mut calls = self.calls();
        calls.submits += 1;
        calls.submitted = self.form.submit_enabled;
        self.form.submit_enabled
    }

    async fn is_application_complete(&self, _session: &dyn Session) -> bool {
        self.form.confirms && self.calls().submitted
    }

    async fn has_errors(&self, _session: &dyn Session) -> Vec<String> {
        if self.form.errors_at_step == Some(self.calls().step) {
            vec!["Please enter a valid phone number".to_string()]
        } else {
            Vec::new()
        }
    }

    async fn handle_popups(&self, _session: &dyn Session) {}

    async fn detect_block(&self, _session: &dyn Session) -> Option<String> {
        let calls = self.calls();
        let blocked = self.block_on_page == Some(calls.page) || self.form.block_at_step == Some(calls.step);
        blocked.then(|| "captcha challenge".to_string())
    }
}
