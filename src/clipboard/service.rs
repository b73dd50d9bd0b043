use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, watch};

use super::{ChangeCount, ClipboardPort, ImageFormat, SCREENSHOT_FORMATS};
use crate::error::AppError;
use crate::history::{
    ClipContent, ClipboardEntry, EntryId, HistoryEvent, HistoryFilter, HistoryStore, InsertOutcome,
};

/// 单次轮询的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// 版本号未变化
    Unchanged,
    /// 版本号变化，但没有可记录的文本（无文本 / 空白）
    Ignored,
    /// 已交给历史存储处理（可能是插入，也可能是重复被忽略）
    Recorded(InsertOutcome),
    /// 读取剪贴板失败，等待下一次轮询
    ReadFailed,
}

struct WatchState {
    history: HistoryStore,
    last_observed: Option<ChangeCount>,
}

/// 剪贴板服务：历史存储 + 变化检测 + 自写入登记
///
/// 由生命周期层构造一次，通过 `Arc` 分发给轮询任务、截图服务和展示层。
pub struct ClipboardService {
    port: Arc<dyn ClipboardPort>,
    state: Mutex<WatchState>,
    current_text: watch::Sender<String>,
}

impl ClipboardService {
    /// 创建服务，并把当前版本号记为已观察
    ///
    /// 启动前已在剪贴板中的内容不会被记录。初始读取失败时，
    /// 第一次成功的轮询会被视为一次变化。
    pub fn new(port: Arc<dyn ClipboardPort>, history: HistoryStore) -> Self {
        let last_observed = match port.read_version() {
            Ok(version) => Some(version),
            Err(err) => {
                log::warn!("读取初始剪贴板版本失败: {}", err);
                None
            }
        };
        let (current_text, _) = watch::channel(String::new());

        Self {
            port,
            state: Mutex::new(WatchState {
                history,
                last_observed,
            }),
            current_text,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, WatchState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("剪贴板服务状态锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 执行一次轮询
    ///
    /// 版本号一旦变化就先登记，再读取内容；即使随后读取失败，
    /// 同一次变化也不会在下一次轮询中被重复处理。
    pub fn poll_once(&self) -> PollOutcome {
        let mut state = self.lock_state();

        let version = match self.port.read_version() {
            Ok(version) => version,
            Err(err) => {
                log::warn!("读取剪贴板版本失败: {}", err);
                return PollOutcome::ReadFailed;
            }
        };
        if state.last_observed == Some(version) {
            return PollOutcome::Unchanged;
        }
        state.last_observed = Some(version);

        let text = match self.port.read_text() {
            Ok(Some(text)) => text,
            Ok(None) => return PollOutcome::Ignored,
            Err(err) => {
                log::warn!("读取剪贴板文本失败: {}", err);
                return PollOutcome::ReadFailed;
            }
        };
        if text.trim().is_empty() {
            return PollOutcome::Ignored;
        }

        let outcome = state.history.insert(ClipContent::Text(text.clone()));
        drop(state);

        if let InsertOutcome::Inserted(id) = outcome {
            log::debug!("📋 记录外部剪贴板变化: {} ({} 字符)", id, text.chars().count());
        }
        self.current_text.send_replace(text);
        PollOutcome::Recorded(outcome)
    }

    /// 把历史条目写回系统剪贴板，并登记为自写入
    ///
    /// 条目不存在时返回 `Ok(None)`，不触碰剪贴板。
    pub fn copy_out(&self, id: EntryId) -> Result<Option<ChangeCount>, AppError> {
        let mut state = self.lock_state();
        let Some(content) = state.history.copy_out(id) else {
            return Ok(None);
        };

        let version = match &content {
            ClipContent::Text(text) => self.port.write_text(text)?,
            ClipContent::Image(bytes) => self.port.write_image(bytes, SCREENSHOT_FORMATS)?,
        };
        state.last_observed = Some(version);
        log::debug!("📋 已复制条目 {} 到剪贴板（自写入版本 {}）", id, version.0);
        Ok(Some(version))
    }

    /// 写入文本并登记为自写入
    pub fn write_text(&self, text: &str) -> Result<ChangeCount, AppError> {
        let mut state = self.lock_state();
        let version = self.port.write_text(text)?;
        state.last_observed = Some(version);
        Ok(version)
    }

    /// 写入 PNG 图片并登记为自写入（截图写回使用）
    pub fn write_image(
        &self,
        png: &[u8],
        formats: &[ImageFormat],
    ) -> Result<ChangeCount, AppError> {
        let mut state = self.lock_state();
        let version = self.port.write_image(png, formats)?;
        state.last_observed = Some(version);
        Ok(version)
    }

    /// 在持锁状态下访问历史存储
    pub fn with_history<T>(&self, op: impl FnOnce(&mut HistoryStore) -> T) -> T {
        let mut state = self.lock_state();
        op(&mut state.history)
    }

    pub fn insert(&self, candidate: ClipContent) -> InsertOutcome {
        self.with_history(|history| history.insert(candidate))
    }

    pub fn delete(&self, id: EntryId) -> bool {
        self.with_history(|history| history.delete(id))
    }

    pub fn toggle_pin(&self, id: EntryId) -> Option<bool> {
        self.with_history(|history| history.toggle_pin(id))
    }

    pub fn clear(&self) {
        self.with_history(|history| history.clear())
    }

    pub fn entries(&self) -> Vec<ClipboardEntry> {
        self.with_history(|history| history.entries().to_vec())
    }

    pub fn search(&self, filter: &HistoryFilter) -> Vec<ClipboardEntry> {
        self.with_history(|history| history.search(filter))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.with_history(|history| history.subscribe())
    }

    /// 最近一次观察到的外部剪贴板文本
    pub fn current_text(&self) -> watch::Receiver<String> {
        self.current_text.subscribe()
    }

    pub fn last_observed(&self) -> Option<ChangeCount> {
        self.lock_state().last_observed
    }
}
