//! 历史查询投影
//!
//! 纯读侧过滤：大小写不敏感的子串搜索 + 可选"仅置顶"。不持有任何状态，
//! 结果保持原列表顺序。

use super::entry::ClipboardEntry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// 搜索关键字，空字符串表示不过滤
    pub search: String,
    /// 仅返回置顶条目
    pub pinned_only: bool,
}

impl HistoryFilter {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: text.into(),
            pinned_only: false,
        }
    }

    pub fn pinned_only(mut self, pinned_only: bool) -> Self {
        self.pinned_only = pinned_only;
        self
    }

    pub fn matches(&self, entry: &ClipboardEntry) -> bool {
        if self.pinned_only && !entry.is_pinned() {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }
        entry
            .display_text()
            .to_lowercase()
            .contains(&self.search.to_lowercase())
    }

    pub fn apply<'a>(&self, entries: &'a [ClipboardEntry]) -> Vec<&'a ClipboardEntry> {
        entries.iter().filter(|entry| self.matches(entry)).collect()
    }
}
