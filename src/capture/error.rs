//! # 截图错误模型
//!
//! 截图链路的所有失败都在 `ScreenshotService` 内部消化：记录日志，会话回到 `Idle`，
//! 历史记录不受影响。向上层暴露时统一转换为 `AppError::Capture`。

use super::geometry::DisplayId;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// 没有可用显示器，或屏幕录制权限被拒绝
    #[error("截图不可用：{0}")]
    Unavailable(String),

    /// 目标显示器在选区完成后被断开
    #[error("找不到显示器：{0}")]
    DisplayNotFound(DisplayId),

    /// 上一次截图仍在采集或写回
    #[error("上一次截图尚未完成")]
    Busy,

    /// 选区过小（正常交互分支，不作为错误上报）
    #[error("选区过小")]
    DegenerateSelection,

    #[error("屏幕采集失败：{0}")]
    CaptureFailed(String),

    #[error("PNG 编码失败：{0}")]
    Encode(String),

    #[error("截图写入剪贴板失败：{0}")]
    Clipboard(String),

    #[error("覆盖层错误：{0}")]
    Overlay(String),
}
