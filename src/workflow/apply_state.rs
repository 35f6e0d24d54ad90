//! 申请状态机的状态与失败原因
//!
//! ```text
//! Init → LoggedIn → OnJobPage → FormOpen → FillingStep(i) → Reviewing → Submitted → Complete
//!                                                                     ↘ DryRun
//! 任意状态 → Failed(reason) / Unsupported
//! ```

use std::fmt;

use crate::error::ErrorKind;

/// 申请失败原因；每个原因对应唯一的错误分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    LoginTimeout,
    NavigationFailed(String),
    FormNotFound,
    TooManySteps(usize),
    StuckOnStep(usize),
    /// 平台显示的错误原文
    FormValidation(Vec<String>),
    SubmitUnavailable,
    ConfirmationTimeout,
    Blocked(String),
    Cancelled,
    DeadlineExceeded,
    ResumeUnavailable(String),
    Internal(String),
}

impl FailureReason {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FailureReason::LoginTimeout
            | FailureReason::ConfirmationTimeout
            | FailureReason::DeadlineExceeded => ErrorKind::Timeout,
            FailureReason::NavigationFailed(_) => ErrorKind::TransientNetwork,
            FailureReason::FormNotFound
            | FailureReason::TooManySteps(_)
            | FailureReason::StuckOnStep(_)
            | FailureReason::SubmitUnavailable => ErrorKind::FormStructural,
            FailureReason::FormValidation(_) => ErrorKind::Validation,
            FailureReason::Blocked(_) => ErrorKind::Blocked,
            FailureReason::Cancelled => ErrorKind::Cancelled,
            FailureReason::ResumeUnavailable(_) | FailureReason::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FailureReason::LoginTimeout => "LoginTimeout",
            FailureReason::NavigationFailed(_) => "NavigationFailed",
            FailureReason::FormNotFound => "FormNotFound",
            FailureReason::TooManySteps(_) => "TooManySteps",
            FailureReason::StuckOnStep(_) => "StuckOnStep",
            FailureReason::FormValidation(_) => "FormValidation",
            FailureReason::SubmitUnavailable => "SubmitUnavailable",
            FailureReason::ConfirmationTimeout => "ConfirmationTimeout",
            FailureReason::Blocked(_) => "Blocked",
            FailureReason::Cancelled => "Cancelled",
            FailureReason::DeadlineExceeded => "DeadlineExceeded",
            FailureReason::ResumeUnavailable(_) => "ResumeUnavailable",
            FailureReason::Internal(_) => "Internal",
        }
    }

    fn message(&self) -> String {
        match self {
            FailureReason::LoginTimeout => "login did not complete in time".to_string(),
            FailureReason::NavigationFailed(url) => format!("could not load {}", url),
            FailureReason::FormNotFound => "no application form detected".to_string(),
            FailureReason::TooManySteps(n) => format!("form did not reach review within {} steps", n),
            FailureReason::StuckOnStep(i) => format!("no next or submit control on step {}", i + 1),
            FailureReason::FormValidation(messages) => messages.join("; "),
            FailureReason::SubmitUnavailable => "submit control missing or disabled".to_string(),
            FailureReason::ConfirmationTimeout => "no confirmation after submit".to_string(),
            FailureReason::Blocked(what) => format!("{}; not attempting to solve", what),
            FailureReason::Cancelled => "cancelled by caller".to_string(),
            FailureReason::DeadlineExceeded => "attempt deadline exceeded".to_string(),
            FailureReason::ResumeUnavailable(e) => format!("resume file unavailable: {}", e),
            FailureReason::Internal(e) => e.clone(),
        }
    }

    /// 上报用的描述：`原因 (分类): 文本`
    pub fn details(&self) -> String {
        format!("{} ({}): {}", self.name(), self.kind(), self.message())
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.details())
    }
}

/// 申请状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyState {
    Init,
    LoggedIn,
    OnJobPage,
    FormOpen,
    /// 表单第 i 步（从 0 开始）
    FillingStep(usize),
    Reviewing,
    Submitted,
    Complete,
    /// 演练模式停在审核页
    DryRun,
    /// 跳转到外部 ATS，附跳转目标描述
    Unsupported(String),
    Failed(FailureReason),
}

impl ApplyState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplyState::Complete | ApplyState::DryRun | ApplyState::Unsupported(_) | ApplyState::Failed(_)
        )
    }

    /// 上报为 success 的终态
    pub fn is_success(&self) -> bool {
        matches!(self, ApplyState::Complete | ApplyState::DryRun)
    }

    /// 终态的上报描述
    pub fn details(&self) -> String {
        match self {
            ApplyState::Complete => "Complete: application submitted and confirmed".to_string(),
            ApplyState::DryRun => "DryRun: stopped before submit".to_string(),
            ApplyState::Unsupported(target) => format!(
                "Unsupported ({}): apply hands off to {}",
                ErrorKind::PlatformUnsupported,
                target
            ),
            ApplyState::Failed(reason) => reason.details(),
            other => format!("{}: not terminal", other),
        }
    }
}

impl fmt::Display for ApplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyState::Init => f.write_str("Init"),
            ApplyState::LoggedIn => f.write_str("LoggedIn"),
            ApplyState::OnJobPage => f.write_str("OnJobPage"),
            ApplyState::FormOpen => f.write_str("FormOpen"),
            ApplyState::FillingStep(i) => write!(f, "FillingStep({})", i),
            ApplyState::Reviewing => f.write_str("Reviewing"),
            ApplyState::Submitted => f.write_str("Submitted"),
            ApplyState::Complete => f.write_str("Complete"),
            ApplyState::DryRun => f.write_str("DryRun"),
            ApplyState::Unsupported(_) => f.write_str("Unsupported"),
            ApplyState::Failed(reason) => write!(f, "Failed({})", reason.name()),
        }
    }
}
