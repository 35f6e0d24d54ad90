use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::ScraperSessionConfig;
use crate::error::{AppResult, BrowserError};

/// 按会话配置启动浏览器
///
/// 返回浏览器和后台事件处理任务，任务需要在关闭会话时一并结束
pub async fn launch_browser(config: &ScraperSessionConfig) -> AppResult<(Browser, JoinHandle<()>)> {
    info!("🚀 启动浏览器 (headless: {})...", config.headless);

    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport_width, config.viewport_height)
        .viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .request_timeout(config.timeout())
        .args(vec![
            "--no-sandbox".to_string(),            // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage".to_string(), // 防止共享内存不足
            "--disable-blink-features=AutomationControlled".to_string(),
            "--no-first-run".to_string(),
            format!("--lang={}", config.locale),
        ]);

    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    if let Some(path) = &config.chrome_executable {
        debug!("使用指定浏览器: {}", path.display());
        builder = builder.chrome_executable(path);
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        BrowserError::ConfigurationFailed { reason: e }
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::LaunchFailed {
            source: Box::new(e),
        }
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok((browser, handler_task))
}
