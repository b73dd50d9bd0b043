//! 截图执行器
//!
//! ## 流程
//!
//! 1. 等待稳定延迟（覆盖层已经关闭，给窗口服务器时间把它从屏幕上移除）
//! 2. 确认目标显示器仍然连接
//! 3. 坐标映射（全局左下角 → 显示器本地左上角 + 物理像素）
//! 4. 权限检查 → 采集 → PNG 编码
//! 5. 通过 `ClipboardService` 写回剪贴板，写入登记为自写入
//!
//! 任何一步失败都直接返回错误，不会写剪贴板，也不会产生历史记录。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;

use super::error::CaptureError;
use super::geometry::{Display, DisplayId};
use super::mapper::{DeviceRegion, PixelRect, map_to_device_pixels};
use super::region::encode_png;
use super::session::CaptureRequest;
use crate::clipboard::{ChangeCount, ClipboardService, SCREENSHOT_FORMATS};

pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;

/// 显示器枚举能力
pub trait DisplayPort: Send + Sync {
    fn list_displays(&self) -> Result<Vec<Display>, CaptureError>;
}

/// 屏幕采集能力
#[async_trait]
pub trait ScreenCapturer: Send + Sync {
    /// 检查（必要时申请）屏幕录制权限
    async fn ensure_permission(&self) -> Result<(), CaptureError> {
        Ok(())
    }

    /// 采集区域，返回尺寸为 `region.pixel_rect` 的位图
    async fn capture(
        &self,
        display: &Display,
        region: &DeviceRegion,
    ) -> Result<RgbaImage, CaptureError>;
}

/// 一次成功截图的摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub display_id: DisplayId,
    pub pixel_rect: PixelRect,
    pub png_len: usize,
    /// 写入后的剪贴板版本号（已登记为自写入）
    pub version: ChangeCount,
}

pub struct CaptureExecutor {
    displays: Arc<dyn DisplayPort>,
    capturer: Arc<dyn ScreenCapturer>,
    clipboard: Arc<ClipboardService>,
    settle_delay: Duration,
}

impl CaptureExecutor {
    pub fn new(
        displays: Arc<dyn DisplayPort>,
        capturer: Arc<dyn ScreenCapturer>,
        clipboard: Arc<ClipboardService>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            displays,
            capturer,
            clipboard,
            settle_delay,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub async fn execute(&self, request: CaptureRequest) -> Result<CaptureOutcome, CaptureError> {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let target_id = request.display.id;
        let display = self
            .displays
            .list_displays()?
            .into_iter()
            .find(|display| display.id == target_id)
            .ok_or(CaptureError::DisplayNotFound(target_id))?;

        let region = map_to_device_pixels(request.rect, &display)
            .ok_or(CaptureError::DegenerateSelection)?;

        self.capturer.ensure_permission().await?;
        let image = self.capturer.capture(&display, &region).await?;
        let png = encode_png(&image)?;
        let png_len = png.len();

        let clipboard = Arc::clone(&self.clipboard);
        let version =
            tokio::task::spawn_blocking(move || clipboard.write_image(&png, SCREENSHOT_FORMATS))
                .await
                .map_err(|e| CaptureError::Clipboard(e.to_string()))?
                .map_err(|e| CaptureError::Clipboard(e.to_string()))?;

        log::info!(
            "📸 截图已写入剪贴板：显示器 {}，{}x{} 像素，{} 字节",
            display.id,
            region.pixel_rect.width,
            region.pixel_rect.height,
            png_len
        );

        Ok(CaptureOutcome {
            display_id: display.id,
            pixel_rect: region.pixel_rect,
            png_len,
            version,
        })
    }
}
