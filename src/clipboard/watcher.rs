use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{ClipboardService, PollOutcome};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const MIN_POLL_INTERVAL_MS: u64 = 50;
pub const MAX_POLL_INTERVAL_MS: u64 = 10_000;

/// 将配置中的轮询间隔收敛到允许范围
pub fn normalize_poll_interval_ms(value_ms: u64) -> u64 {
    value_ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS)
}

/// 剪贴板轮询器
///
/// 以固定间隔调用 `ClipboardService::poll_once`。间隔决定变化检测的最坏延迟，
/// 是响应速度与唤醒频率之间的权衡，不是正确性超时。
pub struct ClipboardWatcher {
    service: Arc<ClipboardService>,
    interval: Duration,
}

impl ClipboardWatcher {
    pub fn new(service: Arc<ClipboardService>, interval_ms: u64) -> Self {
        Self {
            service,
            interval: Duration::from_millis(normalize_poll_interval_ms(interval_ms)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 在 tokio 运行时上启动轮询任务
    ///
    /// `shutdown` 变为 `true` 或发送端被丢弃时任务退出。
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!("📋 剪贴板轮询已启动，间隔 {}ms", self.interval.as_millis());

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("📋 剪贴板轮询已停止");
    }

    async fn tick(&self) {
        // 剪贴板读取是阻塞调用，放到阻塞线程池，避免占用异步工作线程
        let service = Arc::clone(&self.service);
        match tokio::task::spawn_blocking(move || service.poll_once()).await {
            Ok(PollOutcome::Unchanged) => {}
            Ok(outcome) => log::trace!("📋 轮询结果: {:?}", outcome),
            Err(err) => log::error!("剪贴板轮询任务异常退出: {}", err),
        }
    }
}
