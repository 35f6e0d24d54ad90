//! 会话级指纹策略
//!
//! 在会话初始化时一次性设置：UA、Accept-Language、语言区域、时区、视口，
//! 以及在每个新文档里隐藏自动化痕迹的脚本。不随单次请求变化。

use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use tracing::debug;

use crate::config::ScraperSessionConfig;
use crate::error::{AppResult, BrowserError};

/// 对页面应用会话策略
pub async fn apply_session_policy(page: &Page, config: &ScraperSessionConfig) -> AppResult<()> {
    let user_agent = SetUserAgentOverrideParams::builder()
        .user_agent(config.user_agent.clone())
        .accept_language(config.locale.clone())
        .build()
        .map_err(|reason| BrowserError::ConfigurationFailed { reason })?;
    page.execute(user_agent).await?;

    page.execute(SetTimezoneOverrideParams::new(config.timezone.clone()))
        .await?;
    page.execute(SetLocaleOverrideParams {
        locale: Some(config.locale.clone()),
    })
    .await?;
    page.execute(SetDeviceMetricsOverrideParams::new(
        config.viewport_width as i64,
        config.viewport_height as i64,
        1.0,
        false,
    ))
    .await?;

    page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(stealth_script(
        &config.locale,
    )))
    .await?;

    debug!(
        "会话策略已应用: locale={}, timezone={}, viewport={}x{}",
        config.locale, config.timezone, config.viewport_width, config.viewport_height
    );
    Ok(())
}

/// 隐藏自动化痕迹的脚本，语言列表与会话 locale 保持一致
pub fn stealth_script(locale: &str) -> String {
    let primary = locale.split('-').next().unwrap_or("en");
    let languages = serde_json::json!([locale, primary]);
    format!(
        r#"
        Object.defineProperty(navigator, 'webdriver', {{ get: () => undefined }});
        Object.defineProperty(navigator, 'languages', {{ get: () => {languages} }});
        Object.defineProperty(navigator, 'plugins', {{ get: () => [1, 2, 3, 4, 5] }});
        window.chrome = window.chrome || {{ runtime: {{}} }};
        const originalQuery = window.navigator.permissions && window.navigator.permissions.query;
        if (originalQuery) {{
            window.navigator.permissions.query = (parameters) =>
                parameters.name === 'notifications'
                    ? Promise.resolve({{ state: Notification.permission }})
                    : originalQuery(parameters);
        }}
        "#
    )
}
