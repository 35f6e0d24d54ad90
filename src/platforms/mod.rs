//! 平台适配器
//!
//! 每个招聘平台实现同一个扁平的能力接口 [`PlatformAdapter`]：
//! - 发现：构造搜索 URL、解析结果页、翻页
//! - 申请：登录、打开申请、识别表单与字段、填写、翻步、提交、确认
//!
//! 适配器只描述"去哪找"（有序定位策略、URL 语法、平台文本格式），
//! 不包含循环、重试、节流；这些只在 `workflow` 里出现。

pub mod block;
pub mod common;
pub mod glassdoor;
pub mod indeed;
pub mod linkedin;
pub mod wellfound;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::browser::Session;
use crate::error::AppResult;
use crate::models::{Credentials, DetectedField, JobPosting, Platform, SearchFilters};

pub use block::{ats_name, describe_external, detect_challenge, BlockMarker};
pub use glassdoor::GlassdoorAdapter;
pub use indeed::IndeedAdapter;
pub use linkedin::LinkedInAdapter;
pub use wellfound::WellfoundAdapter;

/// 单个平台的能力接口
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    // ---- 发现 ----

    /// 由过滤条件构造搜索 URL
    fn build_search_url(&self, filters: &SearchFilters) -> AppResult<String>;

    /// 解析结果页；没有命中时返回空列表，不会失败
    fn parse_result_page(&self, html: &str, scraped_at: DateTime<Utc>) -> Vec<JobPosting>;

    fn has_next_page(&self, html: &str) -> bool;

    /// 触发翻页（点击下一页 / 加载更多）
    async fn advance_page(&self, session: &dyn Session) -> bool;

    // ---- 申请 ----

    /// 发起一次登录；是否登录成功由 [`is_logged_in`](Self::is_logged_in) 判断
    async fn login(&self, session: &dyn Session, credentials: &Credentials) -> bool;

    async fn is_logged_in(&self, session: &dyn Session) -> bool;

    /// 当前页面仍在平台自身域名内
    async fn is_on_platform(&self, session: &dyn Session) -> bool;

    /// 点击岗位页上的申请入口
    async fn open_application(&self, session: &dyn Session) -> bool;

    async fn detect_application_form(&self, session: &dyn Session) -> bool;

    /// 申请动作是否交给了平台之外的 ATS
    async fn is_external_redirect(&self, session: &dyn Session) -> bool;

    /// 外部跳转目标的描述（ATS 名称或主机名）
    async fn external_target(&self, session: &dyn Session) -> Option<String>;

    /// 当前步骤的输入控件
    async fn detect_fields(&self, session: &dyn Session) -> Vec<DetectedField>;

    async fn fill_field(&self, session: &dyn Session, field: &DetectedField, value: &str) -> bool;

    async fn upload_resume(&self, session: &dyn Session, path: &Path) -> bool;

    async fn has_submit_control(&self, session: &dyn Session) -> bool;

    async fn has_next_control(&self, session: &dyn Session) -> bool;

    async fn navigate_to_next_step(&self, session: &dyn Session) -> bool;

    /// 点击提交；提交按钮缺失或不可用时返回 false
    async fn submit_application(&self, session: &dyn Session) -> bool;

    async fn is_application_complete(&self, session: &dyn Session) -> bool;

    /// 平台在表单上显示的错误信息（原文）
    async fn has_errors(&self, session: &dyn Session) -> Vec<String>;

    /// 尽力关闭弹窗，失败不影响流程
    async fn handle_popups(&self, session: &dyn Session);

    /// 反自动化拦截检测，返回可读描述
    async fn detect_block(&self, session: &dyn Session) -> Option<String>;
}

/// 按平台取适配器
pub fn adapter_for(platform: Platform) -> Arc<dyn PlatformAdapter> {
    match platform {
        Platform::LinkedIn => Arc::new(LinkedInAdapter::new()),
        Platform::Indeed => Arc::new(IndeedAdapter::new()),
        Platform::Glassdoor => Arc::new(GlassdoorAdapter::new()),
        Platform::Wellfound => Arc::new(WellfoundAdapter::new()),
    }
}
