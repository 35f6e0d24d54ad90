//! 基于 chromiumoxide 的会话实现
//!
//! 元素定位在页面内用脚本完成：命中的元素被打上 `data-jp-handle` 标记，
//! 之后的点击、填写都通过这个唯一选择器找回元素。

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::Browser;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::browser::connection::connect_browser;
use crate::browser::headless::launch_browser;
use crate::browser::locator::{ElementHandle, Locator};
use crate::browser::session::{Session, NAVIGATION_ATTEMPTS};
use crate::browser::stealth::apply_session_policy;
use crate::config::ScraperSessionConfig;
use crate::error::{AppResult, BrowserError};
use crate::infrastructure::JsExecutor;

const LOCATE_FN: &str = r#"(kind, a, b, token) => {
    const textOf = (el) => ((el.innerText || el.textContent || '') + '').trim().toLowerCase();
    let el = null;
    try {
        if (kind === 'css') {
            el = document.querySelector(a);
        } else if (kind === 'text') {
            const needle = b.toLowerCase();
            el = Array.from(document.querySelectorAll(a)).find((e) =>
                textOf(e).includes(needle) ||
                (e.getAttribute('aria-label') || '').toLowerCase().includes(needle) ||
                ((e.value || '') + '').toLowerCase() === needle) || null;
        } else if (kind === 'label') {
            const needle = a.toLowerCase();
            const lab = Array.from(document.querySelectorAll('label')).find((l) => textOf(l).includes(needle));
            if (lab) {
                el = lab.htmlFor ? document.getElementById(lab.htmlFor) : lab.querySelector('input,textarea,select');
            }
        }
    } catch (e) {
        return null;
    }
    if (!el) return null;
    if (!el.getAttribute('data-jp-handle')) el.setAttribute('data-jp-handle', token);
    return '[data-jp-handle="' + el.getAttribute('data-jp-handle') + '"]';
}"#;

const READ_TEXTS_FN: &str = r#"(locators) => {
    const out = [];
    for (const [kind, a, b] of locators) {
        let nodes = [];
        try {
            if (kind === 'css') {
                nodes = Array.from(document.querySelectorAll(a));
            } else if (kind === 'text') {
                nodes = Array.from(document.querySelectorAll(a))
                    .filter((e) => (e.innerText || '').toLowerCase().includes(b.toLowerCase()));
            }
        } catch (e) {
            nodes = [];
        }
        for (const n of nodes) {
            const t = (n.innerText || n.textContent || '').trim();
            if (t && !out.includes(t)) out.push(t);
        }
    }
    return out;
}"#;

const FILL_FN: &str = r#"(sel, value) => {
    const el = document.querySelector(sel);
    if (!el) return false;
    el.focus();
    const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    const desc = Object.getOwnPropertyDescriptor(proto, 'value');
    if (desc && desc.set) { desc.set.call(el, value); } else { el.value = value; }
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    el.blur();
    return true;
}"#;

const SELECT_FN: &str = r#"(sel, option) => {
    const el = document.querySelector(sel);
    if (!el) return false;
    const want = option.trim().toLowerCase();
    if (el.tagName === 'SELECT') {
        const opt = Array.from(el.options).find((o) =>
            o.text.trim().toLowerCase() === want || (o.value || '').toLowerCase() === want);
        if (!opt) return false;
        el.value = opt.value;
        el.dispatchEvent(new Event('change', { bubbles: true }));
        return true;
    }
    if (el.type === 'radio' && el.name) {
        const radios = Array.from(document.querySelectorAll('input[type="radio"]'))
            .filter((r) => r.name === el.name);
        const labelOf = (r) => {
            const l = r.id ? document.querySelector('label[for="' + r.id + '"]') : r.closest('label');
            return l ? (l.innerText || '').trim().toLowerCase() : '';
        };
        const target = radios.find((r) => labelOf(r) === want || (r.value || '').toLowerCase() === want);
        if (!target) return false;
        target.click();
        return true;
    }
    return false;
}"#;

const CHECK_FN: &str = r#"(sel, checked) => {
    const el = document.querySelector(sel);
    if (!el) return false;
    if (el.checked !== checked) el.click();
    return el.checked === checked;
}"#;

const VISIBLE_FN: &str = r#"(sel) => {
    const el = document.querySelector(sel);
    if (!el) return false;
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
}"#;

const ENABLED_FN: &str = r#"(sel) => {
    const el = document.querySelector(sel);
    if (!el) return false;
    return !el.disabled && el.getAttribute('aria-disabled') !== 'true';
}"#;

const CLICK_FN: &str = r#"(sel) => {
    const el = document.querySelector(sel);
    if (!el) return false;
    el.scrollIntoView({ block: 'center' });
    el.click();
    return true;
}"#;

const SYNC_FORM_FN: &str = r#"() => {
    for (const el of document.querySelectorAll('input, textarea, select')) {
        let value = '';
        if (el.type === 'file') {
            value = el.files && el.files.length > 0 ? el.files[0].name : '';
        } else if (el.type === 'checkbox' || el.type === 'radio') {
            value = el.checked ? (el.value || 'on') : '';
        } else {
            value = el.value || '';
        }
        el.setAttribute('data-jp-value', value);
    }
    return true;
}"#;

/// 基于 Chrome 的浏览器会话
pub struct ChromeSession {
    config: ScraperSessionConfig,
    browser: Mutex<Option<Browser>>,
    handler_task: Option<JoinHandle<()>>,
    executor: Option<JsExecutor>,
    /// 连接的是外部浏览器时不关闭浏览器本身
    attached: bool,
    handle_seq: AtomicU64,
}

impl ChromeSession {
    pub fn new(config: ScraperSessionConfig) -> Self {
        Self {
            config,
            browser: Mutex::new(None),
            handler_task: None,
            executor: None,
            attached: false,
            handle_seq: AtomicU64::new(1),
        }
    }

    fn executor(&self) -> Option<&JsExecutor> {
        self.executor.as_ref()
    }

    async fn call_bool(&self, function_src: &str, args: &[serde_json::Value]) -> bool {
        let Some(executor) = self.executor() else {
            warn!("浏览器会话尚未初始化");
            return false;
        };
        match executor.call::<bool>(function_src, args).await {
            Ok(value) => value,
            Err(e) => {
                debug!("页面脚本执行失败: {}", e);
                false
            }
        }
    }

    async fn open_page(&mut self) -> AppResult<()> {
        let browser = self
            .browser
            .get_mut()
            .as_ref()
            .ok_or(BrowserError::NotInitialized)?;
        let page = browser.new_page("about:blank").await.map_err(|e| {
            error!("创建页面失败: {}", e);
            BrowserError::PageCreationFailed {
                source: Box::new(e),
            }
        })?;
        apply_session_policy(&page, &self.config).await?;
        self.executor = Some(JsExecutor::new(page));
        Ok(())
    }
}

#[async_trait]
impl Session for ChromeSession {
    async fn initialize(&mut self) -> AppResult<()> {
        if self.browser.get_mut().is_some() {
            return Ok(());
        }

        let (browser, handler_task) = match self.config.browser_debug_port {
            Some(port) => {
                self.attached = true;
                connect_browser(port).await?
            }
            None => {
                self.attached = false;
                launch_browser(&self.config).await?
            }
        };
        *self.browser.get_mut() = Some(browser);
        self.handler_task = Some(handler_task);

        self.open_page().await?;
        info!("✓ 浏览器会话已就绪");
        Ok(())
    }

    async fn new_page(&mut self) -> AppResult<()> {
        self.open_page().await
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> bool {
        let Some(executor) = self.executor() else {
            warn!("浏览器会话尚未初始化，无法导航");
            return false;
        };

        let mut backoff = Duration::from_millis(500);
        for attempt in 1..=NAVIGATION_ATTEMPTS {
            match tokio::time::timeout(timeout, executor.page().goto(url)).await {
                Ok(Ok(_)) => {
                    debug!("已导航到: {}", url);
                    return true;
                }
                Ok(Err(e)) => {
                    warn!(
                        "导航失败 (尝试 {}/{}): {} - {}",
                        attempt, NAVIGATION_ATTEMPTS, url, e
                    );
                }
                Err(_) => {
                    warn!(
                        "导航超时 (尝试 {}/{}, {:?}): {}",
                        attempt, NAVIGATION_ATTEMPTS, timeout, url
                    );
                }
            }
            if attempt < NAVIGATION_ATTEMPTS {
                sleep(backoff).await;
                backoff *= 2;
            }
        }

        error!("导航到 {} 失败，已尝试 {} 次", url, NAVIGATION_ATTEMPTS);
        false
    }

    async fn locate(&self, locators: &[Locator]) -> Option<ElementHandle> {
        let executor = self.executor()?;
        for locator in locators {
            let (kind, a, b) = locator.script_args();
            let token = format!("h{}", self.handle_seq.fetch_add(1, Ordering::Relaxed));
            let result = executor
                .call::<Option<String>>(LOCATE_FN, &[json!(kind), json!(a), json!(b), json!(token)])
                .await;
            match result {
                Ok(Some(selector)) => {
                    debug!("定位成功: {}", locator);
                    return Some(ElementHandle::new(selector, locator.clone()));
                }
                Ok(None) => {}
                Err(e) => debug!("定位脚本失败 {}: {}", locator, e),
            }
        }
        None
    }

    async fn read_texts(&self, locators: &[Locator]) -> Vec<String> {
        let Some(executor) = self.executor() else {
            return Vec::new();
        };
        let specs: Vec<serde_json::Value> = locators
            .iter()
            .map(|l| {
                let (kind, a, b) = l.script_args();
                json!([kind, a, b])
            })
            .collect();
        executor
            .call::<Vec<String>>(READ_TEXTS_FN, &[json!(specs)])
            .await
            .unwrap_or_default()
    }

    async fn click(&self, handle: &ElementHandle) -> bool {
        if let Some(executor) = self.executor() {
            // 优先真实鼠标事件，失败再退回脚本点击
            if let Ok(element) = executor.page().find_element(handle.selector.as_str()).await {
                if element.scroll_into_view().await.is_ok() && element.click().await.is_ok() {
                    return true;
                }
            }
        }
        self.call_bool(CLICK_FN, &[json!(handle.selector)]).await
    }

    async fn fill(&self, handle: &ElementHandle, value: &str) -> bool {
        self.call_bool(FILL_FN, &[json!(handle.selector), json!(value)])
            .await
    }

    async fn select_option(&self, handle: &ElementHandle, option: &str) -> bool {
        self.call_bool(SELECT_FN, &[json!(handle.selector), json!(option)])
            .await
    }

    async fn set_checked(&self, handle: &ElementHandle, checked: bool) -> bool {
        self.call_bool(CHECK_FN, &[json!(handle.selector), json!(checked)])
            .await
    }

    async fn upload_file(&self, handle: &ElementHandle, path: &Path) -> bool {
        let Some(executor) = self.executor() else {
            return false;
        };
        let element = match executor.page().find_element(handle.selector.as_str()).await {
            Ok(element) => element,
            Err(e) => {
                warn!("未找到文件控件 {}: {}", handle.selector, e);
                return false;
            }
        };
        let mut params = SetFileInputFilesParams::new(vec![path.to_string_lossy().to_string()]);
        params.backend_node_id = Some(element.backend_node_id);
        match executor.page().execute(params).await {
            Ok(_) => {
                debug!("已上传文件: {}", path.display());
                true
            }
            Err(e) => {
                warn!("上传文件失败 {}: {}", path.display(), e);
                false
            }
        }
    }

    async fn wait_visible(&self, handle: &ElementHandle, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.call_bool(VISIBLE_FN, &[json!(handle.selector)]).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    async fn is_enabled(&self, handle: &ElementHandle) -> bool {
        self.call_bool(ENABLED_FN, &[json!(handle.selector)]).await
    }

    async fn content(&self) -> Option<String> {
        let executor = self.executor()?;
        match executor.page().content().await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!("获取页面内容失败: {}", e);
                None
            }
        }
    }

    async fn form_snapshot(&self) -> Option<String> {
        if !self.call_bool(SYNC_FORM_FN, &[]).await {
            debug!("同步表单值失败，使用原始快照");
        }
        self.content().await
    }

    async fn current_url(&self) -> Option<String> {
        let executor = self.executor()?;
        executor.page().url().await.ok().flatten()
    }

    async fn title(&self) -> Option<String> {
        let executor = self.executor()?;
        executor.page().get_title().await.ok().flatten()
    }

    fn default_timeout(&self) -> Duration {
        self.config.timeout()
    }

    async fn close(&mut self) {
        let executor = self.executor.take();
        if let Some(mut browser) = self.browser.get_mut().take() {
            if self.attached {
                if let Some(executor) = executor {
                    if let Err(e) = executor.page().clone().close().await {
                        debug!("关闭页面失败: {}", e);
                    }
                }
            } else {
                if let Err(e) = browser.close().await {
                    debug!("关闭浏览器失败: {}", e);
                }
                if let Err(e) = browser.wait().await {
                    debug!("等待浏览器退出失败: {}", e);
                }
            }
            info!("🧹 浏览器会话已关闭");
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}
