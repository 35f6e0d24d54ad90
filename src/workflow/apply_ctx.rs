//! 申请上下文
//!
//! 封装"我正在申请哪个岗位、走到了哪一步"这一信息；
//! 一次申请独占一个实例，终态之后不再变化

use std::fmt::Display;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{JobPosting, Platform};
use crate::services::StatusEvent;
use crate::workflow::apply_state::ApplyState;

/// 一次申请
#[derive(Debug, Clone)]
pub struct ApplicationAttempt {
    /// 本次申请的唯一标识（重试是新的一次申请）
    pub attempt_id: Uuid,
    pub job_id: String,
    pub platform: Platform,
    pub status: ApplyState,
    /// 当前表单步骤（从 0 开始）
    pub step_index: usize,
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ApplicationAttempt {
    pub fn new(posting: &JobPosting) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            job_id: posting.id.clone(),
            platform: posting.platform,
            status: ApplyState::Init,
            step_index: 0,
            last_error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// 进入一个非终态
    pub fn enter(&mut self, state: ApplyState) {
        if self.status.is_terminal() {
            return;
        }
        debug!("{} {} → {}", self, self.status, state);
        if let ApplyState::FillingStep(i) = state {
            self.step_index = i;
        }
        self.status = state;
    }

    /// 进入终态；已经是终态时忽略
    pub fn finish(&mut self, state: ApplyState) {
        if self.status.is_terminal() {
            return;
        }
        debug!("{} {} → {}", self, self.status, state);
        if !state.is_success() {
            self.last_error = Some(state.details());
        }
        self.status = state;
        self.completed_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// 终态对应的状态事件
    pub fn to_event(&self) -> StatusEvent {
        let details = self.status.details();
        if self.is_success() {
            StatusEvent::success(&self.job_id, self.platform, details)
        } else {
            StatusEvent::failure(&self.job_id, self.platform, details)
        }
    }
}

impl Display for ApplicationAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[岗位 {}]", self.job_id)
    }
}
