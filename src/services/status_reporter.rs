//! 申请状态上报服务 - 业务能力层
//!
//! 每次申请到达终态时发出一条事件 `{jobId, platform, status, details, timestamp}`。
//! 对流水线来说通道是只写、发出即忘的：发送失败只记日志，不影响申请结果。

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::Platform;

/// 终态归类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Failure,
}

/// 状态事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub job_id: String,
    pub platform: Platform,
    pub status: StatusKind,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn success(job_id: impl Into<String>, platform: Platform, details: impl Into<String>) -> Self {
        Self::new(job_id, platform, StatusKind::Success, details)
    }

    pub fn failure(job_id: impl Into<String>, platform: Platform, details: impl Into<String>) -> Self {
        Self::new(job_id, platform, StatusKind::Failure, details)
    }

    fn new(job_id: impl Into<String>, platform: Platform, status: StatusKind, details: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            platform,
            status,
            details: details.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusKind::Success
    }
}

/// 状态事件的去处
#[async_trait]
pub trait StatusSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn publish(&self, event: &StatusEvent) -> AppResult<()>;
}

/// 只写日志
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl StatusSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn publish(&self, event: &StatusEvent) -> AppResult<()> {
        match event.status {
            StatusKind::Success => info!(
                "[岗位 {}] 📮 状态: success ({}) {}",
                event.job_id, event.platform, event.details
            ),
            StatusKind::Failure => warn!(
                "[岗位 {}] 📮 状态: failure ({}) {}",
                event.job_id, event.platform, event.details
            ),
        }
        Ok(())
    }
}

/// 每个事件追加一行 JSON
///
/// 职责：
/// - 追加写入，不截断已有内容
/// - 同一实例内串行写，保证行不交错
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl StatusSink for JsonlSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn publish(&self, event: &StatusEvent) -> AppResult<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))?;
        file.flush()
            .await
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))?;

        debug!("状态事件已写入 {}", self.path.display());
        Ok(())
    }
}

/// 进程内消息通道
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelSink {
    /// 创建通道，返回 sink 与接收端
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl StatusSink for ChannelSink {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn publish(&self, event: &StatusEvent) -> AppResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| AppError::Other("状态通道已关闭".to_string()))
    }
}

/// POST JSON 到 webhook
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl StatusSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn publish(&self, event: &StatusEvent) -> AppResult<()> {
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::Other(format!("webhook 发送失败: {}", e)))?;
        Ok(())
    }
}

/// 同时发往多个 sink，单个失败不影响其他
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn StatusSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl StatusSink for FanoutSink {
    fn name(&self) -> &'static str {
        "fanout"
    }

    async fn publish(&self, event: &StatusEvent) -> AppResult<()> {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event).await {
                warn!("[岗位 {}] 状态发送到 {} 失败: {}", event.job_id, sink.name(), e);
            }
        }
        Ok(())
    }
}

/// 流水线持有的上报器
#[derive(Clone)]
pub struct StatusReporter {
    sink: Arc<dyn StatusSink>,
}

impl StatusReporter {
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self { sink }
    }

    /// 按配置组装：日志 + JSONL 文件 + 可选 webhook
    pub fn from_config(config: &Config) -> Self {
        let mut fanout = FanoutSink::new()
            .with(Arc::new(LogSink))
            .with(Arc::new(JsonlSink::new(&config.status_log_file)));
        if let Some(url) = &config.status_webhook_url {
            fanout = fanout.with(Arc::new(WebhookSink::new(url.clone())));
        }
        Self::new(Arc::new(fanout))
    }

    /// 发出事件；失败只记日志
    pub async fn report(&self, event: &StatusEvent) {
        if let Err(e) = self.sink.publish(event).await {
            warn!("[岗位 {}] 状态发送到 {} 失败: {}", event.job_id, self.sink.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = StatusEvent::failure("indeed:abc", Platform::Indeed, "FormNotFound: no form");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["jobId"], "indeed:abc");
        assert_eq!(json["platform"], "indeed");
        assert_eq!(json["status"], "failure");
        assert_eq!(json["details"], "FormNotFound: no form");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::new();
        let reporter = StatusReporter::new(Arc::new(sink));
        reporter
            .report(&StatusEvent::success("linkedin:1", Platform::LinkedIn, "Complete"))
            .await;
        let received = rx.recv().await.unwrap();
        assert!(received.is_success());
        assert_eq!(received.job_id, "linkedin:1");
    }

    #[tokio::test]
    async fn test_jsonl_sink_appends_lines() {
        let path = std::env::temp_dir().join(format!("status-{}.jsonl", uuid::Uuid::new_v4()));
        let sink = JsonlSink::new(&path);
        sink.publish(&StatusEvent::success("a", Platform::Indeed, "ok")).await.unwrap();
        sink.publish(&StatusEvent::failure("b", Platform::Indeed, "Timeout")).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<StatusEvent> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].job_id, "b");
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_fanout_tolerates_closed_channel() {
        let (closed, rx) = ChannelSink::new();
        drop(rx);
        let (open, mut open_rx) = ChannelSink::new();
        let fanout = FanoutSink::new().with(Arc::new(closed)).with(Arc::new(open));
        assert_eq!(fanout.len(), 2);

        fanout
            .publish(&StatusEvent::failure("x", Platform::Wellfound, "Blocked"))
            .await
            .unwrap();
        assert_eq!(open_rx.recv().await.unwrap().job_id, "x");
    }
}
