//! 基于 `xcap` 的显示器枚举与屏幕采集
//!
//! `xcap` 使用左上角原点的虚拟桌面坐标，这里以主显示器高度为基准翻转为
//! 左下角原点，与核心的全局坐标约定保持一致。
//!
//! `xcap` 只能整屏采集，因此先截取整块显示器，再按实际图像密度裁剪，
//! 最后缩放到映射器给出的物理像素尺寸。

use async_trait::async_trait;
use image::RgbaImage;
use xcap::Monitor;

use super::error::CaptureError;
use super::executor::{DisplayPort, ScreenCapturer};
use super::geometry::{Display, DisplayId, Rect};
use super::mapper::DeviceRegion;
use super::region::{crop_region, fit_to_size};

/// 从 `xcap::Monitor` 读出的原始几何信息
#[derive(Debug, Clone, Copy, PartialEq)]
struct MonitorGeometry {
    id: DisplayId,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    scale_factor: f32,
    is_primary: bool,
}

fn read_geometry(monitor: &Monitor) -> Result<MonitorGeometry, CaptureError> {
    let failed =
        |e: xcap::XCapError| CaptureError::Unavailable(format!("读取显示器信息失败: {}", e));
    Ok(MonitorGeometry {
        id: monitor.id().map_err(failed)?,
        x: monitor.x().map_err(failed)?,
        y: monitor.y().map_err(failed)?,
        width: monitor.width().map_err(failed)?,
        height: monitor.height().map_err(failed)?,
        scale_factor: monitor.scale_factor().map_err(failed)?,
        is_primary: monitor.is_primary().unwrap_or(false),
    })
}

/// 左上角原点 → 左下角原点
fn to_displays(monitors: &[MonitorGeometry]) -> Vec<Display> {
    let primary_height = monitors
        .iter()
        .find(|m| m.is_primary)
        .or_else(|| monitors.first())
        .map(|m| f64::from(m.height))
        .unwrap_or_default();

    monitors
        .iter()
        .map(|m| {
            let height = f64::from(m.height);
            Display {
                id: m.id,
                frame: Rect::new(
                    f64::from(m.x),
                    primary_height - (f64::from(m.y) + height),
                    f64::from(m.width),
                    height,
                ),
                scale_factor: f64::from(m.scale_factor),
            }
        })
        .collect()
}

/// 按采集图像的实际密度换算裁剪区域（图像尺寸 / 逻辑尺寸）
fn crop_rect_in_image(
    image_size: (u32, u32),
    display: &Display,
    source: Rect,
) -> (u32, u32, u32, u32) {
    let ratio_x = f64::from(image_size.0) / display.frame.width.max(1.0);
    let ratio_y = f64::from(image_size.1) / display.frame.height.max(1.0);

    let x = (source.x * ratio_x).floor().max(0.0) as u32;
    let y = (source.y * ratio_y).floor().max(0.0) as u32;
    let width = (source.width * ratio_x).round().max(1.0) as u32;
    let height = (source.height * ratio_y).round().max(1.0) as u32;
    (x, y, width, height)
}

fn list_monitors() -> Result<Vec<Monitor>, CaptureError> {
    Monitor::all().map_err(|e| CaptureError::Unavailable(format!("枚举显示器失败: {}", e)))
}

fn capture_blocking(display: Display, region: DeviceRegion) -> Result<RgbaImage, CaptureError> {
    let monitors = list_monitors()?;
    let monitor = monitors
        .into_iter()
        .find(|m| m.id().map(|id| id == display.id).unwrap_or(false))
        .ok_or(CaptureError::DisplayNotFound(display.id))?;

    let full = monitor
        .capture_image()
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

    let (x, y, width, height) = crop_rect_in_image(full.dimensions(), &display, region.source_rect);
    let cropped = crop_region(&full, x, y, width, height)?;
    Ok(fit_to_size(
        cropped,
        region.pixel_rect.width,
        region.pixel_rect.height,
    ))
}

/// 真实屏幕适配器
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapScreens;

impl XcapScreens {
    pub fn new() -> Self {
        Self
    }
}

impl DisplayPort for XcapScreens {
    fn list_displays(&self) -> Result<Vec<Display>, CaptureError> {
        let monitors = list_monitors()?;
        let geometry = monitors
            .iter()
            .map(read_geometry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(to_displays(&geometry))
    }
}

#[async_trait]
impl ScreenCapturer for XcapScreens {
    async fn capture(
        &self,
        display: &Display,
        region: &DeviceRegion,
    ) -> Result<RgbaImage, CaptureError> {
        let (display, region) = (*display, *region);
        tokio::task::spawn_blocking(move || capture_blocking(display, region))
            .await
            .map_err(|e| CaptureError::CaptureFailed(format!("采集任务异常退出: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(
        id: DisplayId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        is_primary: bool,
    ) -> MonitorGeometry {
        MonitorGeometry {
            id,
            x,
            y,
            width,
            height,
            scale_factor: 1.0,
            is_primary,
        }
    }

    #[test]
    fn frames_are_flipped_against_primary_height() {
        let displays = to_displays(&[
            geometry(1, 0, 0, 1920, 1080, true),
            geometry(2, 1920, -200, 1280, 800, false),
        ]);

        assert_eq!(displays[0].frame, Rect::new(0.0, 0.0, 1920.0, 1080.0));
        // 顶边比主屏高 200：上边沿 y = 1280，底边 = 1280 - 800
        assert_eq!(displays[1].frame, Rect::new(1920.0, 480.0, 1280.0, 800.0));
    }

    #[test]
    fn crop_rect_follows_actual_image_density() {
        let display = Display {
            id: 1,
            frame: Rect::new(0.0, 0.0, 1440.0, 900.0),
            scale_factor: 2.0,
        };
        let crop = crop_rect_in_image((2880, 1800), &display, Rect::new(100.0, 50.0, 200.0, 100.0));
        assert_eq!(crop, (200, 100, 400, 200));
    }
}
