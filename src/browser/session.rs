//! 浏览器会话能力
//!
//! 流水线和适配器只通过这个 trait 操作浏览器，真实实现见 [`ChromeSession`](super::ChromeSession)。
//! 每个方法都是显式的挂起点，超时作为参数传入。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::locator::{ElementHandle, Locator};
use crate::error::AppResult;

/// 导航的最大尝试次数
pub const NAVIGATION_ATTEMPTS: u32 = 3;

/// 一个自动化任务独占的浏览器会话
#[async_trait]
pub trait Session: Send + Sync {
    /// 启动 / 连接浏览器并配置会话级策略
    async fn initialize(&mut self) -> AppResult<()>;

    /// 打开一个新页面并作为当前页面
    async fn new_page(&mut self) -> AppResult<()>;

    /// 导航到 URL；瞬时失败内部最多尝试 [`NAVIGATION_ATTEMPTS`] 次（指数退避）
    ///
    /// 页面加载成功但没有期望内容不算失败
    async fn navigate(&self, url: &str, timeout: Duration) -> bool;

    /// 按顺序尝试定位策略，返回第一个命中的元素
    async fn locate(&self, locators: &[Locator]) -> Option<ElementHandle>;

    /// 所有策略命中元素的可见文本（去重、保持顺序）
    async fn read_texts(&self, locators: &[Locator]) -> Vec<String>;

    async fn click(&self, handle: &ElementHandle) -> bool;

    /// 填写文本，触发 input / change 事件
    async fn fill(&self, handle: &ElementHandle, value: &str) -> bool;

    /// 选择下拉框中文本或值匹配的选项
    async fn select_option(&self, handle: &ElementHandle, option: &str) -> bool;

    async fn set_checked(&self, handle: &ElementHandle, checked: bool) -> bool;

    async fn upload_file(&self, handle: &ElementHandle, path: &Path) -> bool;

    /// 等待元素可见
    async fn wait_visible(&self, handle: &ElementHandle, timeout: Duration) -> bool;

    /// 元素可用（未 disabled / aria-disabled）
    async fn is_enabled(&self, handle: &ElementHandle) -> bool;

    /// 当前页面 HTML 快照
    async fn content(&self) -> Option<String>;

    /// 表单快照：先把控件的实时值写回属性，再取 HTML
    async fn form_snapshot(&self) -> Option<String>;

    async fn current_url(&self) -> Option<String>;

    async fn title(&self) -> Option<String>;

    /// 会话的默认等待时长
    fn default_timeout(&self) -> Duration;

    /// 释放所有资源；幂等，未初始化时调用也安全
    async fn close(&mut self);
}

/// 便捷操作：定位后点击
pub async fn click_first(session: &dyn Session, locators: &[Locator]) -> bool {
    match session.locate(locators).await {
        Some(handle) => session.click(&handle).await,
        None => false,
    }
}

/// 便捷操作：定位后在给定时间内等待可见
pub async fn visible_within(session: &dyn Session, locators: &[Locator], timeout: Duration) -> bool {
    match session.locate(locators).await {
        Some(handle) => session.wait_visible(&handle, timeout).await,
        None => false,
    }
}
