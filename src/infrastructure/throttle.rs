//! 请求节流器 - 基础设施层
//!
//! 每次访问平台（导航、翻页）之前都必须先经过这里：
//! 滑动窗口配额 + 最小间隔 + 随机抖动

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::debug;

use crate::config::ScraperSessionConfig;

/// 节流参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub requests_per_window: usize,
    pub window: Duration,
}

impl ThrottleConfig {
    pub fn from_session(config: &ScraperSessionConfig) -> Self {
        Self {
            min_delay: Duration::from_millis(config.throttle_min_delay_ms),
            max_delay: Duration::from_millis(config.throttle_max_delay_ms.max(config.throttle_min_delay_ms)),
            requests_per_window: config.requests_per_window.max(1),
            window: Duration::from_millis(config.window_ms),
        }
    }
}

/// 节流状态，只归节流器自己所有
#[derive(Debug, Default)]
struct ThrottleState {
    last_request_at: Option<Instant>,
    /// 当前窗口内的请求时间，按先后排列
    request_timestamps: VecDeque<Instant>,
}

/// 节流状态快照（仅用于观测）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleStatus {
    pub requests_in_window: usize,
    pub requests_per_window: usize,
    /// 最早一条记录滑出窗口还需要多久；窗口为空时为 0
    pub time_to_reset: Duration,
}

/// 在同一平台的多个并发会话之间共享的节流器
pub type SharedThrottle = Arc<Mutex<ThrottleManager>>;

/// 请求节流器
///
/// 单写者：`wait()` 需要 `&mut self`，跨任务共享时套一层 [`SharedThrottle`]
pub struct ThrottleManager {
    config: ThrottleConfig,
    state: ThrottleState,
    rng: StdRng,
}

impl ThrottleManager {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            state: ThrottleState::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// 使用固定随机种子（测试用，抖动可复现）
    pub fn with_seed(config: ThrottleConfig, seed: u64) -> Self {
        Self {
            config,
            state: ThrottleState::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_session(config: &ScraperSessionConfig) -> Self {
        Self::new(ThrottleConfig::from_session(config))
    }

    pub fn shared(self) -> SharedThrottle {
        Arc::new(Mutex::new(self))
    }

    /// 阻塞到可以发出下一次请求，然后记录这次请求
    pub async fn wait(&mut self) {
        // 1-2. 窗口配额
        loop {
            let now = Instant::now();
            self.prune(now);
            if self.state.request_timestamps.len() < self.config.requests_per_window {
                break;
            }
            let Some(&oldest) = self.state.request_timestamps.front() else {
                break;
            };
            let ready_at = oldest + self.config.window;
            debug!(
                "窗口配额已满 ({}/{}), 等待 {:?}",
                self.state.request_timestamps.len(),
                self.config.requests_per_window,
                ready_at.saturating_duration_since(now)
            );
            sleep_until(ready_at).await;
        }

        // 3. 最小间隔
        if let Some(last) = self.state.last_request_at {
            let ready_at = last + self.config.min_delay;
            if Instant::now() < ready_at {
                sleep_until(ready_at).await;
            }
        }

        // 4. 随机抖动
        let jitter = self.jitter();
        if !jitter.is_zero() {
            sleep(jitter).await;
        }

        // 5. 记录
        let now = Instant::now();
        self.state.last_request_at = Some(now);
        self.state.request_timestamps.push_back(now);
    }

    /// 当前窗口占用情况
    pub fn status(&self) -> ThrottleStatus {
        let now = Instant::now();
        let live: Vec<&Instant> = self
            .state
            .request_timestamps
            .iter()
            .filter(|ts| now.saturating_duration_since(**ts) < self.config.window)
            .collect();
        let time_to_reset = live
            .first()
            .map(|oldest| (**oldest + self.config.window).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);
        ThrottleStatus {
            requests_in_window: live.len(),
            requests_per_window: self.config.requests_per_window,
            time_to_reset,
        }
    }

    /// 替换节流参数，下一次 `wait()` 起生效；已记录的请求保留
    pub fn update_config(&mut self, config: ThrottleConfig) {
        debug!("更新节流配置: {:?}", config);
        self.config = config;
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.state.request_timestamps.front() {
            if now.saturating_duration_since(oldest) >= self.config.window {
                self.state.request_timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn jitter(&mut self) -> Duration {
        let span = self.config.max_delay.saturating_sub(self.config.min_delay);
        let span_ms = span.as_millis() as u64;
        if span_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.gen_range(0..=span_ms))
    }
}
