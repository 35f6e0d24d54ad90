//! 申请流程 - 流程层
//!
//! 核心职责：驱动"一个岗位"的申请状态机
//!
//! 流程顺序：
//! 1. 准备简历文件 → 初始化会话 → 登录
//! 2. 打开岗位页 → 点击申请（外部 ATS 直接 Unsupported）
//! 3. 逐步填写表单（最多 10 步）→ 审核 → 提交 → 等待确认
//! 4. 无论结果：关闭会话、删除临时简历、发出恰好一条状态事件

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::browser::Session;
use crate::config::{Config, MAX_FORM_STEPS};
use crate::infrastructure::SharedThrottle;
use crate::models::{ApplicantProfile, Credentials, DetectedField, JobPosting, TailoredOutput};
use crate::platforms::PlatformAdapter;
use crate::services::{FieldMapper, ResumeFile, StatusReporter};
use crate::utils::truncate_text;
use crate::workflow::apply_ctx::ApplicationAttempt;
use crate::workflow::apply_state::{ApplyState, FailureReason};
use crate::workflow::cancel::CancelSignal;

/// 登录、确认页的轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(500);

type StepResult<T = ()> = Result<T, FailureReason>;

/// 申请流程参数
#[derive(Debug, Clone)]
pub struct ApplySettings {
    /// 停在审核页，不点提交
    pub dry_run: bool,
    pub step_limit: usize,
    pub login_timeout: Duration,
    pub confirmation_wait: Duration,
    pub resume_dir: PathBuf,
}

impl ApplySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dry_run: config.dry_run,
            step_limit: config.step_limit.clamp(1, MAX_FORM_STEPS),
            login_timeout: Duration::from_millis(config.login_timeout_ms),
            confirmation_wait: Duration::from_millis(config.confirmation_wait_ms),
            resume_dir: config.resume_temp_dir.clone(),
        }
    }
}

/// 一次申请的输入，全部只读
#[derive(Debug, Clone, Copy)]
pub struct ApplyRequest<'a> {
    pub posting: &'a JobPosting,
    pub tailored: &'a TailoredOutput,
    /// 不提供时沿用浏览器现有的登录状态
    pub credentials: Option<&'a Credentials>,
}

/// 申请流程
///
/// - 编排状态机，决定何时登录、填写、翻步、提交
/// - 站点相关的一切都交给适配器
/// - 不持有会话；会话由调用方传入，流程结束时关闭
pub struct ApplyFlow {
    adapter: Arc<dyn PlatformAdapter>,
    throttle: SharedThrottle,
    reporter: StatusReporter,
    profile: ApplicantProfile,
    settings: ApplySettings,
}

impl ApplyFlow {
    pub fn new(
        adapter: Arc<dyn PlatformAdapter>,
        throttle: SharedThrottle,
        reporter: StatusReporter,
        profile: ApplicantProfile,
        settings: ApplySettings,
    ) -> Self {
        Self {
            adapter,
            throttle,
            reporter,
            profile,
            settings,
        }
    }

    pub fn settings(&self) -> &ApplySettings {
        &self.settings
    }

    /// 执行一次申请
    ///
    /// # 参数
    /// - `session`: 本次申请独占的会话，返回前一定被关闭
    /// - `request`: 岗位、定制内容、凭据
    /// - `cancel`: 取消信号，在步骤之间生效
    /// - `deadline`: 整体期限，超时记为 `DeadlineExceeded`
    ///
    /// # 返回
    /// 处于终态的申请记录；状态事件已经发出
    pub async fn run(
        &self,
        session: &mut dyn Session,
        request: &ApplyRequest<'_>,
        cancel: &CancelSignal,
        deadline: Option<Duration>,
    ) -> ApplicationAttempt {
        let mut attempt = ApplicationAttempt::new(request.posting);
        let mut resume: Option<ResumeFile> = None;
        log_attempt_start(&attempt, request.posting, &self.settings);

        let result = {
            let guarded =
                AssertUnwindSafe(self.drive(&mut *session, request, &mut attempt, &mut resume, cancel))
                    .catch_unwind();
            let bounded = async move {
                let outcome = match deadline {
                    Some(limit) => match tokio::time::timeout(limit, guarded).await {
                        Ok(outcome) => outcome,
                        Err(_) => Ok(Err(FailureReason::DeadlineExceeded)),
                    },
                    None => guarded.await,
                };
                match outcome {
                    Ok(result) => result,
                    Err(panic) => Err(FailureReason::Internal(format!(
                        "panic: {}",
                        panic_message(panic.as_ref())
                    ))),
                }
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FailureReason::Cancelled),
                result = bounded => result,
            }
        };

        // 清理不依赖结果
        session.close().await;
        if let Some(mut file) = resume.take() {
            file.cleanup();
        }

        attempt.finish(match result {
            Ok(state) => state,
            Err(reason) => ApplyState::Failed(reason),
        });
        log_attempt_end(&attempt);
        self.reporter.report(&attempt.to_event()).await;
        attempt
    }

    /// 状态机主体；返回 Ok 时是成功类终态或 Unsupported
    async fn drive(
        &self,
        session: &mut dyn Session,
        request: &ApplyRequest<'_>,
        attempt: &mut ApplicationAttempt,
        resume: &mut Option<ResumeFile>,
        cancel: &CancelSignal,
    ) -> StepResult<ApplyState> {
        let posting = request.posting;
        if request.tailored.job_id != posting.id {
            warn!(
                "{} 定制内容属于 {}，与当前岗位不一致",
                attempt, request.tailored.job_id
            );
        }

        let file = ResumeFile::materialize(
            &request.tailored.tailored_resume,
            &self.settings.resume_dir,
            &posting.id,
        )
        .await
        .map_err(|e| FailureReason::ResumeUnavailable(e.to_string()))?;
        let resume_path = file.path().to_path_buf();
        *resume = Some(file);

        session
            .initialize()
            .await
            .map_err(|e| FailureReason::Internal(format!("browser session: {}", e)))?;
        let session: &dyn Session = &*session;

        // Init → LoggedIn
        self.login(session, request.credentials, attempt).await?;
        attempt.enter(ApplyState::LoggedIn);
        ensure_active(cancel)?;

        // LoggedIn → OnJobPage
        self.open_job_page(session, posting, attempt).await?;
        attempt.enter(ApplyState::OnJobPage);
        ensure_active(cancel)?;

        // OnJobPage → FormOpen
        if let Some(target) = self.open_form(session, attempt).await? {
            return Ok(ApplyState::Unsupported(target));
        }
        attempt.enter(ApplyState::FormOpen);

        // FormOpen → FillingStep(0..) → Reviewing
        self.fill_steps(session, request.tailored, attempt, &resume_path, cancel)
            .await?;
        attempt.enter(ApplyState::Reviewing);
        ensure_active(cancel)?;
        self.check_errors(session, attempt).await?;

        if self.settings.dry_run {
            info!("{} 🧪 演练模式：已到审核页，不提交", attempt);
            return Ok(ApplyState::DryRun);
        }

        // Reviewing → Submitted
        info!("{} 📤 正在提交申请...", attempt);
        self.throttle().await;
        if !self.adapter.submit_application(session).await {
            return Err(FailureReason::SubmitUnavailable);
        }
        attempt.enter(ApplyState::Submitted);

        // Submitted → Complete
        self.await_confirmation(session, attempt).await?;
        Ok(ApplyState::Complete)
    }

    async fn login(
        &self,
        session: &dyn Session,
        credentials: Option<&Credentials>,
        attempt: &ApplicationAttempt,
    ) -> StepResult {
        let Some(credentials) = credentials else {
            info!("{} 未提供凭据，沿用浏览器现有登录状态", attempt);
            return Ok(());
        };

        info!("{} 🔐 正在登录 {}...", attempt, self.adapter.platform());
        self.throttle().await;
        if !self.adapter.login(session, credentials).await {
            debug!("{} 登录操作未全部完成，继续等待登录状态", attempt);
        }

        let deadline = Instant::now() + self.settings.login_timeout;
        loop {
            self.check_block(session, attempt).await?;
            if self.adapter.is_logged_in(session).await {
                info!("{} ✓ 登录成功", attempt);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(FailureReason::LoginTimeout);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn open_job_page(
        &self,
        session: &dyn Session,
        posting: &JobPosting,
        attempt: &ApplicationAttempt,
    ) -> StepResult {
        info!("{} 🌐 打开岗位页: {}", attempt, posting.url);
        self.throttle().await;
        if !session.navigate(&posting.url, session.default_timeout()).await {
            return Err(FailureReason::NavigationFailed(posting.url.clone()));
        }
        self.check_block(session, attempt).await?;
        self.adapter.handle_popups(session).await;
        Ok(())
    }

    /// 点击申请入口；跳到外部 ATS 时返回跳转目标
    async fn open_form(
        &self,
        session: &dyn Session,
        attempt: &ApplicationAttempt,
    ) -> StepResult<Option<String>> {
        if !self.adapter.open_application(session).await {
            debug!("{} 没有点到申请入口，按当前页面继续判断", attempt);
        }
        self.adapter.handle_popups(session).await;

        if self.adapter.is_external_redirect(session).await {
            let target = self
                .adapter
                .external_target(session)
                .await
                .unwrap_or_else(|| "an external site".to_string());
            warn!("{} ↪️ 申请跳转到外部站点 {}，不做自动化", attempt, target);
            return Ok(Some(target));
        }

        self.check_block(session, attempt).await?;
        if !self.adapter.detect_application_form(session).await {
            return Err(FailureReason::FormNotFound);
        }
        info!("{} ✓ 申请表单已打开", attempt);
        Ok(None)
    }

    async fn fill_steps(
        &self,
        session: &dyn Session,
        tailored: &TailoredOutput,
        attempt: &mut ApplicationAttempt,
        resume_path: &Path,
        cancel: &CancelSignal,
    ) -> StepResult {
        let mapper = FieldMapper::new(&self.profile, tailored);

        for step in 0..self.settings.step_limit {
            ensure_active(cancel)?;
            attempt.enter(ApplyState::FillingStep(step));
            self.check_block(session, attempt).await?;
            self.check_errors(session, attempt).await?;

            let fields = self.adapter.detect_fields(session).await;
            let filled = self
                .fill_fields(session, &fields, &mapper, resume_path, attempt)
                .await;
            info!(
                "{} 📝 第 {} 步: 检测到 {} 个字段，填写 {} 个",
                attempt,
                step + 1,
                fields.len(),
                filled
            );

            if self.adapter.has_submit_control(session).await {
                return Ok(());
            }
            if !self.adapter.has_next_control(session).await {
                return Err(FailureReason::StuckOnStep(step));
            }
            self.throttle().await;
            if !self.adapter.navigate_to_next_step(session).await {
                return Err(FailureReason::StuckOnStep(step));
            }
        }

        Err(FailureReason::TooManySteps(self.settings.step_limit))
    }

    /// 填写本步骤中尚未填写的字段，返回成功填写的数量
    async fn fill_fields(
        &self,
        session: &dyn Session,
        fields: &[DetectedField],
        mapper: &FieldMapper<'_>,
        resume_path: &Path,
        attempt: &ApplicationAttempt,
    ) -> usize {
        let mut filled = 0;

        if fields.iter().any(|f| f.is_file() && !f.filled) {
            if self.adapter.upload_resume(session, resume_path).await {
                info!("{} 📎 已上传简历", attempt);
                filled += 1;
            } else {
                warn!("{} 简历上传失败", attempt);
            }
        }

        for field in fields.iter().filter(|f| !f.filled && !f.is_file()) {
            let Some(value) = mapper.value_for(field) else {
                if field.required {
                    debug!("{} 必填字段没有可用的值: {}", attempt, field.label);
                }
                continue;
            };
            if self.adapter.fill_field(session, field, &value).await {
                debug!("{} 已填写 {} = {}", attempt, field.label, truncate_text(&value, 40));
                filled += 1;
            } else {
                warn!("{} 字段填写失败: {}", attempt, field.label);
            }
        }
        filled
    }

    async fn await_confirmation(&self, session: &dyn Session, attempt: &ApplicationAttempt) -> StepResult {
        let deadline = Instant::now() + self.settings.confirmation_wait;
        loop {
            if self.adapter.is_application_complete(session).await {
                info!("{} 🎉 申请已确认", attempt);
                return Ok(());
            }
            self.check_errors(session, attempt).await?;
            if Instant::now() >= deadline {
                return Err(FailureReason::ConfirmationTimeout);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn check_errors(&self, session: &dyn Session, attempt: &ApplicationAttempt) -> StepResult {
        let errors = self.adapter.has_errors(session).await;
        if errors.is_empty() {
            return Ok(());
        }
        warn!("{} ⚠️ 表单报错: {}", attempt, errors.join(" | "));
        Err(FailureReason::FormValidation(errors))
    }

    async fn check_block(&self, session: &dyn Session, attempt: &ApplicationAttempt) -> StepResult {
        match self.adapter.detect_block(session).await {
            Some(what) => {
                warn!("{} 🚫 检测到反自动化验证: {}", attempt, what);
                Err(FailureReason::Blocked(what))
            }
            None => Ok(()),
        }
    }

    async fn throttle(&self) {
        self.throttle.lock().await.wait().await;
    }
}

fn ensure_active(cancel: &CancelSignal) -> StepResult {
    if cancel.is_cancelled() {
        Err(FailureReason::Cancelled)
    } else {
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_attempt_start(attempt: &ApplicationAttempt, posting: &JobPosting, settings: &ApplySettings) {
    info!("{}", "─".repeat(60));
    info!(
        "{} 🚀 开始申请: {} ({})",
        attempt,
        describe_posting(posting),
        attempt.platform
    );
    if settings.dry_run {
        info!("{} 演练模式：不会真正提交", attempt);
    }
}

/// 岗位的日志描述；只有 URL 的岗位（命令行单条申请）直接显示 URL
fn describe_posting(posting: &JobPosting) -> String {
    match (posting.title.trim(), posting.company.trim()) {
        ("", "") => posting.url.clone(),
        (title, "") => title.to_string(),
        ("", company) => format!("{} 的岗位", company),
        (title, company) => format!("{} @ {}", title, company),
    }
}

fn log_attempt_end(attempt: &ApplicationAttempt) {
    let elapsed = attempt
        .completed_at
        .map(|end| (end - attempt.started_at).num_seconds())
        .unwrap_or_default();
    if attempt.is_success() {
        info!(
            "{} ✅ {} (耗时 {}s)",
            attempt,
            attempt.status.details(),
            elapsed
        );
    } else {
        error!(
            "{} ❌ {} (停在第 {} 步，耗时 {}s)",
            attempt,
            attempt.status.details(),
            attempt.step_index + 1,
            elapsed
        );
    }
}
