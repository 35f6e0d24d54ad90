//! 抓取流程 - 流程层
//!
//! 初始化会话 → 构造搜索 URL → 节流 → 导航 → 循环 { 解析 → 去重追加 → 判断停止 → 节流 → 翻页 }
//!
//! 单页解析失败按 0 条处理；导航失败、被拦截、被取消都返回已抓到的部分结果

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::browser::Session;
use crate::config::ScraperSessionConfig;
use crate::error::AppResult;
use crate::infrastructure::SharedThrottle;
use crate::models::{JobPosting, Platform, SearchFilters};
use crate::platforms::PlatformAdapter;
use crate::workflow::cancel::CancelSignal;

/// 抓取停止的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// 已达到 max_results
    MaxResults,
    /// 没有下一页
    LastPage,
    /// 翻页次数达到上限
    MaxPages,
    /// 首次导航或翻页失败
    NavigationFailed,
    Blocked(String),
    Cancelled,
}

/// 一次抓取的结果
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub platform: Platform,
    pub postings: Vec<JobPosting>,
    /// 实际解析过的页数
    pub pages: usize,
    pub stop: StopReason,
}

impl ScrapeOutcome {
    /// 是否因为异常提前结束（结果仍然有效）
    pub fn is_partial(&self) -> bool {
        matches!(
            self.stop,
            StopReason::NavigationFailed | StopReason::Blocked(_) | StopReason::Cancelled
        )
    }
}

/// 抓取流程
///
/// - 只编排：会话、节流、解析都来自外部
/// - 站点相关的 URL、选择器全部在适配器里
pub struct ScrapeFlow {
    adapter: Arc<dyn PlatformAdapter>,
    throttle: SharedThrottle,
    max_results: usize,
    max_pages: usize,
}

impl ScrapeFlow {
    pub fn new(adapter: Arc<dyn PlatformAdapter>, throttle: SharedThrottle, config: &ScraperSessionConfig) -> Self {
        Self {
            adapter,
            throttle,
            max_results: config.max_results.max(1),
            max_pages: config.max_pages.max(1),
        }
    }

    /// 执行一次抓取；会话在返回前关闭
    ///
    /// # 返回
    /// - `Err`: 搜索条件无法构造 URL，或浏览器无法启动
    /// - `Ok`: 抓到的岗位（长度不超过 max_results，ID 唯一）和停止原因
    pub async fn run(
        &self,
        session: &mut dyn Session,
        filters: &SearchFilters,
        cancel: &CancelSignal,
    ) -> AppResult<ScrapeOutcome> {
        let result = self.collect(&mut *session, filters, cancel).await;
        session.close().await;
        result
    }

    async fn collect(
        &self,
        session: &mut dyn Session,
        filters: &SearchFilters,
        cancel: &CancelSignal,
    ) -> AppResult<ScrapeOutcome> {
        let platform = self.adapter.platform();
        let url = self.adapter.build_search_url(filters)?;
        session.initialize().await?;
        let session: &dyn Session = &*session;

        info!("[抓取 {}] 🔍 {}", platform, url);
        let mut outcome = ScrapeOutcome {
            platform,
            postings: Vec::new(),
            pages: 0,
            stop: StopReason::NavigationFailed,
        };

        self.throttle().await;
        if !session.navigate(&url, session.default_timeout()).await {
            warn!("[抓取 {}] ❌ 无法打开搜索页", platform);
            return Ok(outcome);
        }

        let mut seen: HashSet<String> = HashSet::new();
        outcome.stop = loop {
            outcome.pages += 1;
            let page = outcome.pages;

            if let Some(what) = self.adapter.detect_block(session).await {
                warn!("[抓取 {}] 🚫 第 {} 页被拦截: {}", platform, page, what);
                break StopReason::Blocked(what);
            }

            let html = session.content().await.unwrap_or_default();
            let parsed = self.parse_page(&html, page);
            let before = outcome.postings.len();
            outcome.postings.extend(
                parsed
                    .into_iter()
                    .filter(|p| p.is_emittable() && seen.insert(p.id.clone())),
            );
            info!(
                "[抓取 {}] 第 {} 页: 新增 {} 个岗位，累计 {}",
                platform,
                page,
                outcome.postings.len() - before,
                outcome.postings.len()
            );

            if outcome.postings.len() >= self.max_results {
                break StopReason::MaxResults;
            }
            if !self.adapter.has_next_page(&html) {
                break StopReason::LastPage;
            }
            if page >= self.max_pages {
                break StopReason::MaxPages;
            }
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            self.throttle().await;
            if !self.adapter.advance_page(session).await {
                warn!("[抓取 {}] ❌ 翻到第 {} 页失败", platform, page + 1);
                break StopReason::NavigationFailed;
            }
        };

        outcome.postings.truncate(self.max_results);
        log_scrape_end(&outcome);
        Ok(outcome)
    }

    /// 解析一页；解析器内部故障按 0 条处理
    fn parse_page(&self, html: &str, page: usize) -> Vec<JobPosting> {
        if html.trim().is_empty() {
            warn!("[抓取 {}] 第 {} 页没有取到内容", self.adapter.platform(), page);
            return Vec::new();
        }
        let scraped_at = Utc::now();
        match std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.adapter.parse_result_page(html, scraped_at)
        })) {
            Ok(postings) => postings,
            Err(_) => {
                warn!(
                    "[抓取 {}] ⚠️ 第 {} 页解析失败，按 0 条处理",
                    self.adapter.platform(),
                    page
                );
                Vec::new()
            }
        }
    }

    async fn throttle(&self) {
        self.throttle.lock().await.wait().await;
    }
}

fn log_scrape_end(outcome: &ScrapeOutcome) {
    let message = format!(
        "[抓取 {}] ✓ 完成: {} 个岗位，{} 页，停止原因 {:?}",
        outcome.platform,
        outcome.postings.len(),
        outcome.pages,
        outcome.stop
    );
    if outcome.is_partial() {
        warn!("{}", message);
    } else {
        info!("{}", message);
    }
    debug!(
        "[抓取 {}] 岗位 ID: {:?}",
        outcome.platform,
        outcome.postings.iter().map(|p| p.id.as_str()).collect::<Vec<_>>()
    );
}
