//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，所有可能失败的核心操作统一返回
//! `Result<T, AppError>`，避免各模块分散的字符串错误。
//!
//! 按照后台工具的定位，这些错误全部在本地消化：持久化失败回退为空历史，
//! 截图失败回到 `Idle`，快捷键冲突退化为仅菜单入口。没有任何一种会让进程崩溃。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `CaptureError` / `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，方便展示层直接透传。

use serde::Serialize;

use crate::capture::CaptureError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 剪贴板读写操作失败
    #[error("剪贴板操作失败: {0}")]
    Clipboard(String),

    /// 历史记录序列化 / 反序列化 / 偏好存储读写失败
    #[error("持久化失败: {0}")]
    Persistence(String),

    /// 截图流水线错误（权限 / 显示器 / 采集 / 编码）
    #[error("{0}")]
    Capture(#[from] CaptureError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据目录或配置文件不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),

    /// 全局快捷键注册冲突（由生命周期层上报，功能退化为仅菜单入口）
    #[error("快捷键注册失败: {0}")]
    HotkeyConflict(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
