//! 取消信号
//!
//! 调用方持有一份克隆，随时 `cancel()`；流程在两个步骤之间检查，
//! 也可以在长等待中 `cancelled().await` 提前醒来。取消后仍会执行会话清理。

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// 发出取消；所有克隆都能看到
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待取消发生；已经取消时立即返回
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // 发送端和 self 同生命周期，wait_for 只会在取消后返回
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}
