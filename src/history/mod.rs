//! 剪贴板历史模块
//!
//! - `entry`：条目数据模型与序列化格式
//! - `store`：去重 / 有界 / 持久化的历史存储与变更通知
//! - `query`：搜索与"仅置顶"读侧投影

mod entry;
mod query;
mod store;

pub use entry::{ClipContent, ClipboardEntry, EntryId, IMAGE_PLACEHOLDER};
pub use query::HistoryFilter;
pub use store::{DEFAULT_CAPACITY, HistoryEvent, HistoryStore, InsertOutcome};
