//! 适配器共用的单步操作
//!
//! 都是"一次定位 + 一次动作"的组合，不含循环重试，供各平台适配器拼装。

use std::path::Path;
use std::time::Duration;

use tracing::debug;
use url::Url;

use super::block::{self, BlockMarker};
use crate::browser::{Locator, Session};
use crate::error::{AppResult, PlatformError};
use crate::models::{DetectedField, InputType, Platform, SearchFilters};
use crate::parser::DocumentParser;

/// 控件可见性的短等待
pub const CONTROL_WAIT: Duration = Duration::from_millis(1500);

/// 搜索关键字去空白后不能为空
pub fn require_keywords(platform: Platform, filters: &SearchFilters) -> AppResult<String> {
    let keywords = filters.keywords.split_whitespace().collect::<Vec<_>>().join(" ");
    if keywords.is_empty() {
        return Err(PlatformError::SearchUrl {
            platform: platform.as_str(),
            reason: "关键字为空".to_string(),
        }
        .into());
    }
    Ok(keywords)
}

/// 在基准地址上追加查询参数
pub fn url_with_query(platform: Platform, base: &str, params: &[(&str, String)]) -> AppResult<String> {
    let mut url = Url::parse(base).map_err(|e| PlatformError::SearchUrl {
        platform: platform.as_str(),
        reason: e.to_string(),
    })?;
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }
    Ok(url.to_string())
}

/// 元素存在且在短时间内可见
pub async fn control_visible(session: &dyn Session, locators: &[Locator]) -> bool {
    crate::browser::visible_within(session, locators, CONTROL_WAIT).await
}

/// 定位到可用的控件后点击
pub async fn click_enabled(session: &dyn Session, locators: &[Locator]) -> bool {
    let Some(handle) = session.locate(locators).await else {
        return false;
    };
    if !session.is_enabled(&handle).await {
        debug!("控件不可用: {}", handle.matched_by);
        return false;
    }
    session.click(&handle).await
}

/// 定位元素后填写
pub async fn fill_first(session: &dyn Session, locators: &[Locator], value: &str) -> bool {
    match session.locate(locators).await {
        Some(handle) => session.fill(&handle, value).await,
        None => false,
    }
}

/// 依次尝试关闭弹窗，找不到或点击失败都忽略
pub async fn dismiss_all(session: &dyn Session, locators: &[Locator]) {
    for locator in locators {
        if let Some(handle) = session.locate(std::slice::from_ref(locator)).await {
            if session.click(&handle).await {
                debug!("已关闭弹窗: {}", locator);
            }
        }
    }
}

/// 表单快照中的字段
pub async fn snapshot_fields(session: &dyn Session, scope: &[Locator]) -> Vec<DetectedField> {
    match session.form_snapshot().await {
        Some(html) => fields_in(&html, scope),
        None => Vec::new(),
    }
}

fn fields_in(html: &str, scope: &[Locator]) -> Vec<DetectedField> {
    DocumentParser::new(html).form_fields(scope)
}

/// 页面快照中第一个命中元素的属性
pub async fn snapshot_attr(session: &dyn Session, locators: &[Locator], name: &str) -> Option<String> {
    let html = session.content().await?;
    attr_in(&html, locators, name)
}

fn attr_in(html: &str, locators: &[Locator], name: &str) -> Option<String> {
    DocumentParser::new(html).first_attr(locators, name)
}

/// 按控件类型填写检测到的字段
pub async fn fill_detected(session: &dyn Session, field: &DetectedField, value: &str) -> bool {
    let target = [Locator::css_owned(field.selector.clone())];
    let Some(handle) = session.locate(&target).await else {
        debug!("字段已不在页面上: {} ({})", field.label, field.selector);
        return false;
    };
    match field.input_type {
        InputType::Text | InputType::Textarea => session.fill(&handle, value).await,
        InputType::Select | InputType::Radio => session.select_option(&handle, value).await,
        InputType::Checkbox => session.set_checked(&handle, is_truthy(value)).await,
        InputType::File => session.upload_file(&handle, Path::new(value)).await,
    }
}

/// 上传到第一个命中的文件控件
pub async fn upload_to(session: &dyn Session, locators: &[Locator], path: &Path) -> bool {
    match session.locate(locators).await {
        Some(handle) => session.upload_file(&handle, path).await,
        None => false,
    }
}

/// 当前 URL 属于给定域名之一
pub async fn on_hosts(session: &dyn Session, suffixes: &[&str]) -> bool {
    session
        .current_url()
        .await
        .map(|url| block::host_matches(&url, suffixes))
        .unwrap_or(false)
}

/// 当前 URL 的外部跳转描述；仍在平台内时返回 None
pub async fn external_url_target(session: &dyn Session, suffixes: &[&str]) -> Option<String> {
    let url = session.current_url().await?;
    if block::host_matches(&url, suffixes) || !url.starts_with("http") {
        return None;
    }
    Some(block::describe_external(&url))
}

/// 在当前页面快照与标题中查找拦截特征
pub async fn challenge_on_page(session: &dyn Session, extra: &[BlockMarker]) -> Option<String> {
    let html = session.content().await.unwrap_or_default();
    let title = session.title().await;
    block::detect_challenge(&html, title.as_deref(), extra)
}

/// 复选框取值：yes / true / 1 / on / checked 视为勾选
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "y" | "true" | "1" | "on" | "checked"
    )
}

/// 转成 URL 路径片段：小写、非字母数字替换为 `-`
pub fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
