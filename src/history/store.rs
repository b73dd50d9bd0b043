//! 历史记录存储
//!
//! # 设计思路
//!
//! `HistoryStore` 维护一个按插入顺序（最新在前）排列、去重、有界的条目列表，
//! 每次有效变更后立即整体序列化写回偏好存储，并通过广播通道通知订阅方。
//!
//! # 行为约定
//!
//! - 文本去重比较**未裁剪**的原始字符串；空白判断才使用 `trim()`。
//!   因此 `"abc"` 与 `"abc "` 是两条不同记录。
//! - 超出容量时从尾部（最旧）截断，置顶条目**不**豁免截断。
//!   这是当前产品行为的已知限制，保持原样。
//! - 加载失败（无数据 / 数据损坏 / 字段不兼容）一律回退为空历史，只记录日志，
//!   保证冷启动永远不会被历史数据阻塞。

use tokio::sync::broadcast;

use super::entry::{ClipContent, ClipboardEntry, EntryId};
use super::query::HistoryFilter;
use crate::db::{HISTORY_KEY, PreferenceStore};
use crate::error::AppError;

/// 默认历史容量
pub const DEFAULT_CAPACITY: usize = 10;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// `insert` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 已插入到列表头部
    Inserted(EntryId),
    /// 已存在完全相同的文本，未插入
    DuplicateIgnored,
    /// 空文本、纯空白文本或空图片，未插入
    EmptyIgnored,
}

/// 历史变更通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    Inserted(EntryId),
    Deleted(EntryId),
    PinToggled { id: EntryId, pinned: bool },
    Cleared,
}

pub struct HistoryStore {
    entries: Vec<ClipboardEntry>,
    capacity: usize,
    backend: Box<dyn PreferenceStore>,
    events: broadcast::Sender<HistoryEvent>,
}

impl HistoryStore {
    /// 从偏好存储加载历史
    ///
    /// 任何读取或解码失败都只记录日志并返回空历史。
    pub fn load(backend: Box<dyn PreferenceStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let entries = match read_entries(backend.as_ref()) {
            Ok(Some(mut entries)) => {
                entries.truncate(capacity);
                log::info!("📚 已加载 {} 条剪贴板历史", entries.len());
                entries
            }
            Ok(None) => {
                log::info!("📚 未找到剪贴板历史，使用空历史");
                Vec::new()
            }
            Err(err) => {
                log::warn!("加载剪贴板历史失败，回退为空历史: {}", err);
                Vec::new()
            }
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries,
            capacity,
            backend,
            events,
        }
    }

    /// 将完整条目列表序列化写入偏好存储
    pub fn persist(&self) -> Result<(), AppError> {
        let encoded = serde_json::to_vec(&self.entries)
            .map_err(|e| AppError::Persistence(format!("序列化剪贴板历史失败: {}", e)))?;
        self.backend.set(HISTORY_KEY, &encoded)
    }

    /// 插入新条目（文本去重 + 容量截断 + 持久化）
    pub fn insert(&mut self, candidate: ClipContent) -> InsertOutcome {
        match &candidate {
            ClipContent::Text(text) => {
                if text.trim().is_empty() {
                    return InsertOutcome::EmptyIgnored;
                }
                if self.contains_text(text) {
                    log::trace!("⏭️  剪贴板内容已存在于历史中，跳过");
                    return InsertOutcome::DuplicateIgnored;
                }
            }
            ClipContent::Image(bytes) if bytes.is_empty() => {
                log::debug!("空图片数据，跳过");
                return InsertOutcome::EmptyIgnored;
            }
            ClipContent::Image(_) => {}
        }

        let entry = ClipboardEntry::new(candidate);
        let id = entry.id();
        self.entries.insert(0, entry);
        self.trim_to_capacity();
        self.persist_logged();
        self.notify(HistoryEvent::Inserted(id));
        InsertOutcome::Inserted(id)
    }

    /// 删除指定条目；不存在时静默忽略
    ///
    /// 返回是否确实删除了条目。无论是否命中都会持久化。
    pub fn delete(&mut self, id: EntryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id() != id);
        let removed = self.entries.len() != before;
        self.persist_logged();
        if removed {
            self.notify(HistoryEvent::Deleted(id));
        }
        removed
    }

    /// 切换置顶状态；不存在时静默忽略并返回 `None`
    pub fn toggle_pin(&mut self, id: EntryId) -> Option<bool> {
        let pinned = self
            .entries
            .iter_mut()
            .find(|entry| entry.id() == id)?
            .toggle_pinned();
        self.persist_logged();
        self.notify(HistoryEvent::PinToggled { id, pinned });
        Some(pinned)
    }

    /// 清空全部历史
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist_logged();
        self.notify(HistoryEvent::Cleared);
    }

    /// 取出条目内容以写回系统剪贴板
    ///
    /// 写入本身以及"自写入"版本号的登记由调用方负责，
    /// 见 `ClipboardService::copy_out`。
    pub fn copy_out(&self, id: EntryId) -> Option<ClipContent> {
        self.get(id).map(|entry| entry.content().clone())
    }

    pub fn get(&self, id: EntryId) -> Option<&ClipboardEntry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn entries(&self) -> &[ClipboardEntry] {
        &self.entries
    }

    pub fn search(&self, filter: &HistoryFilter) -> Vec<ClipboardEntry> {
        filter.apply(&self.entries).into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 订阅历史变更通知
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.events.subscribe()
    }

    fn contains_text(&self, text: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.content().as_text() == Some(text))
    }

    fn trim_to_capacity(&mut self) {
        if self.entries.len() > self.capacity {
            let dropped = self.entries.len() - self.capacity;
            self.entries.truncate(self.capacity);
            log::debug!("✂️ 历史超出容量 {}，丢弃最旧的 {} 条", self.capacity, dropped);
        }
    }

    fn persist_logged(&self) {
        if let Err(err) = self.persist() {
            log::error!("保存剪贴板历史失败: {}", err);
        }
    }

    fn notify(&self, event: HistoryEvent) {
        // 没有订阅者时发送失败是正常情况
        let _ = self.events.send(event);
    }
}

fn read_entries(backend: &dyn PreferenceStore) -> Result<Option<Vec<ClipboardEntry>>, AppError> {
    let Some(bytes) = backend.get(HISTORY_KEY)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| AppError::Persistence(format!("解析剪贴板历史失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryPreferences;

    fn text(s: &str) -> ClipContent {
        ClipContent::Text(s.to_string())
    }

    fn store_with(prefs: &MemoryPreferences, capacity: usize) -> HistoryStore {
        HistoryStore::load(Box::new(prefs.clone()), capacity)
    }

    #[test]
    fn insert_places_newest_first() {
        let mut store = store_with(&MemoryPreferences::new(), 10);
        store.insert(text("first"));
        store.insert(text("second"));

        let labels: Vec<_> = store.entries().iter().map(|e| e.display_text()).collect();
        assert_eq!(labels, vec!["second", "first"]);
    }

    #[test]
    fn duplicate_text_is_ignored_not_moved() {
        let mut store = store_with(&MemoryPreferences::new(), 10);
        store.insert(text("abc"));
        store.insert(text("other"));

        assert_eq!(store.insert(text("abc")), InsertOutcome::DuplicateIgnored);
        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[0].display_text(), "other");
    }

    #[test]
    fn dedup_is_case_sensitive_and_untrimmed() {
        let mut store = store_with(&MemoryPreferences::new(), 10);
        store.insert(text("abc"));

        assert!(matches!(store.insert(text("abc ")), InsertOutcome::Inserted(_)));
        assert!(matches!(store.insert(text("ABC")), InsertOutcome::Inserted(_)));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        let mut store = store_with(&MemoryPreferences::new(), 10);
        assert_eq!(store.insert(text("")), InsertOutcome::EmptyIgnored);
        assert_eq!(store.insert(text("   ")), InsertOutcome::EmptyIgnored);
        assert_eq!(store.insert(text("\n\t")), InsertOutcome::EmptyIgnored);
        assert!(store.is_empty());
    }

    #[test]
    fn empty_image_is_ignored() {
        let prefs = MemoryPreferences::new();
        let mut store = store_with(&prefs, 10);
        let mut rx = store.subscribe();

        assert_eq!(store.insert(ClipContent::Image(Vec::new())), InsertOutcome::EmptyIgnored);
        assert!(store.is_empty());
        assert!(rx.try_recv().is_err());
        assert!(prefs.get(HISTORY_KEY).unwrap().is_none());
    }

    #[test]
    fn images_are_never_deduplicated() {
        let mut store = store_with(&MemoryPreferences::new(), 10);
        store.insert(ClipContent::Image(vec![1, 2, 3]));
        store.insert(ClipContent::Image(vec![1, 2, 3]));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn trimming_drops_pinned_entries_too() {
        let mut store = store_with(&MemoryPreferences::new(), 3);
        let InsertOutcome::Inserted(oldest) = store.insert(text("oldest")) else {
            panic!("expected insert");
        };
        store.toggle_pin(oldest);

        store.insert(text("b"));
        store.insert(text("c"));
        store.insert(text("d"));

        assert_eq!(store.len(), 3);
        assert!(store.get(oldest).is_none());
    }

    #[test]
    fn toggle_pin_twice_restores_and_unknown_is_noop() {
        let mut store = store_with(&MemoryPreferences::new(), 10);
        let InsertOutcome::Inserted(id) = store.insert(text("x")) else {
            panic!("expected insert");
        };

        assert_eq!(store.toggle_pin(id), Some(true));
        assert_eq!(store.toggle_pin(id), Some(false));
        assert_eq!(store.toggle_pin(EntryId::new_v4()), None);
        assert!(!store.entries()[0].is_pinned());
    }

    #[test]
    fn delete_unknown_id_is_noop() {
        let mut store = store_with(&MemoryPreferences::new(), 10);
        store.insert(text("x"));

        assert!(!store.delete(EntryId::new_v4()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_and_clear_are_persisted() {
        let prefs = MemoryPreferences::new();
        let mut store = store_with(&prefs, 10);
        let InsertOutcome::Inserted(id) = store.insert(text("gone")) else {
            panic!("expected insert");
        };
        store.insert(text("kept"));
        store.delete(id);

        let reloaded = store_with(&prefs, 10);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.entries()[0].display_text(), "kept");

        store.clear();
        assert!(store_with(&prefs, 10).is_empty());
    }

    #[test]
    fn corrupt_data_loads_as_empty() {
        let prefs = MemoryPreferences::new();
        prefs.set(HISTORY_KEY, b"{not json").unwrap();

        let store = store_with(&prefs, 10);
        assert!(store.is_empty());
    }

    #[test]
    fn load_truncates_to_smaller_capacity() {
        let prefs = MemoryPreferences::new();
        let mut store = store_with(&prefs, 10);
        for i in 0..6 {
            store.insert(text(&format!("item-{i}")));
        }

        let smaller = store_with(&prefs, 4);
        assert_eq!(smaller.len(), 4);
        assert_eq!(smaller.entries()[0].display_text(), "item-5");
    }

    #[test]
    fn copy_out_returns_payload() {
        let mut store = store_with(&MemoryPreferences::new(), 10);
        let InsertOutcome::Inserted(id) = store.insert(text("payload")) else {
            panic!("expected insert");
        };
        assert_eq!(store.copy_out(id), Some(text("payload")));
        assert_eq!(store.copy_out(EntryId::new_v4()), None);
    }

    #[test]
    fn subscribers_receive_mutation_events() {
        let mut store = store_with(&MemoryPreferences::new(), 10);
        let mut rx = store.subscribe();

        let InsertOutcome::Inserted(id) = store.insert(text("x")) else {
            panic!("expected insert");
        };
        store.insert(text("x"));
        store.toggle_pin(id);
        store.clear();

        assert_eq!(rx.try_recv().unwrap(), HistoryEvent::Inserted(id));
        assert_eq!(
            rx.try_recv().unwrap(),
            HistoryEvent::PinToggled { id, pinned: true }
        );
        assert_eq!(rx.try_recv().unwrap(), HistoryEvent::Cleared);
        assert!(rx.try_recv().is_err());
    }
}
