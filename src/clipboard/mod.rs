//! 剪贴板管理模块
//!
//! # 设计思路
//!
//! 系统剪贴板是一个全局共享、没有事件推送的可变资源，只提供单调递增的
//! 版本号（change count）。本模块围绕这个版本号组织：
//!
//! - **轮询**：`watcher` 固定间隔读取版本号，变化时才读取文本并写入历史
//! - **自写入抑制**：应用自身写剪贴板（复制历史条目、截图）时，在同一把锁内
//!   把写入后的版本号登记为"已观察"，下一次轮询看不到变化，不会重复入库
//! - **适配器**：`system` 提供基于 `arboard` 的真实剪贴板实现
//!
//! # 实现思路
//!
//! - `ClipboardPort` 抽象读写原语，核心逻辑只依赖 trait，便于测试替身注入。
//! - `ClipboardService` 用一把 `Mutex` 同时保护 `HistoryStore` 与
//!   `last_observed`，轮询线程与用户操作（删除 / 置顶 / 复制）不会交错。
//! - 读写失败只记录日志，轮询本身就是重试机制。

mod service;
pub mod system;
mod watcher;

pub use service::{ClipboardService, PollOutcome};
pub use system::ArboardClipboard;
pub use watcher::{
    ClipboardWatcher, DEFAULT_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS, MIN_POLL_INTERVAL_MS,
    normalize_poll_interval_ms,
};

use crate::error::AppError;

/// 剪贴板版本号（不透明，只比较是否相等）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChangeCount(pub u64);

/// 写入图片时声明的剪贴板格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Tiff,
}

/// 截图写回剪贴板时同时提供的格式，兼容更多应用
pub const SCREENSHOT_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Tiff];

/// 系统剪贴板原语
///
/// 写操作必须返回写入后的版本号，供 `ClipboardService` 登记为自写入。
pub trait ClipboardPort: Send + Sync {
    /// 读取当前版本号
    fn read_version(&self) -> Result<ChangeCount, AppError>;

    /// 读取当前文本内容，没有文本时返回 `Ok(None)`
    fn read_text(&self) -> Result<Option<String>, AppError>;

    /// 写入文本，返回写入后的版本号
    fn write_text(&self, text: &str) -> Result<ChangeCount, AppError>;

    /// 写入 PNG 编码的图片，返回写入后的版本号
    ///
    /// `formats` 是期望提供的剪贴板表示；适配器无法逐一表达时可以忽略，
    /// 只保证至少写入一种其他应用可粘贴的图片格式。
    fn write_image(&self, png: &[u8], formats: &[ImageFormat]) -> Result<ChangeCount, AppError>;
}
