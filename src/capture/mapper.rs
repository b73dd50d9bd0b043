//! 截图坐标映射
//!
//! 该模块实现截图链路中最容易出错的一步：把全局坐标（左下角原点）中的选区
//! 换算为目标显示器内的采集区域（左上角原点）以及物理像素尺寸。
//!
//! # 设计思路
//!
//! - 纯函数，不依赖任何窗口系统，可直接单元测试。
//! - 垂直翻转必须是 `frame.height - localY - rect.height`，
//!   只翻转 `localY` 会让选区整体偏移一个选区高度。
//! - 物理像素尺寸截断取整，并保证至少为 1。

use super::geometry::{Display, Rect};

/// 可采集区域的最小边长（逻辑像素，不含）
pub const MIN_CAPTURE_EXTENT: f64 = 1.0;

/// 物理像素矩形（左上角原点，相对目标显示器）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// 交给采集原语的区域描述
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceRegion {
    /// 显示器本地逻辑坐标（左上角原点）
    pub source_rect: Rect,
    /// 乘以缩放比例后的物理像素区域
    pub pixel_rect: PixelRect,
}

fn to_pixels(value: f64, scale_factor: f64) -> u32 {
    (value * scale_factor).floor().max(0.0) as u32
}

/// 全局坐标选区 → 显示器本地逻辑坐标（左上角原点），不做合法性检查
pub fn to_display_local(global_rect: Rect, display: &Display) -> Rect {
    let local_x = global_rect.x - display.frame.x;
    let local_y = global_rect.y - display.frame.y;
    let flipped_y = display.frame.height - local_y - global_rect.height;

    Rect::new(local_x, flipped_y, global_rect.width, global_rect.height)
}

/// 全局坐标选区 → 采集区域
///
/// 宽或高 `<= 1` 的退化区域无法采集，返回 `None`。
pub fn map_to_device_pixels(global_rect: Rect, display: &Display) -> Option<DeviceRegion> {
    let source_rect = to_display_local(global_rect, display);
    if source_rect.width <= MIN_CAPTURE_EXTENT || source_rect.height <= MIN_CAPTURE_EXTENT {
        log::debug!(
            "选区 {}x{} 过小，无法采集",
            source_rect.width,
            source_rect.height
        );
        return None;
    }

    let scale = display.scale_factor;
    let pixel_rect = PixelRect {
        x: to_pixels(source_rect.x, scale),
        y: to_pixels(source_rect.y, scale),
        width: to_pixels(source_rect.width, scale).max(1),
        height: to_pixels(source_rect.height, scale).max(1),
    };

    Some(DeviceRegion {
        source_rect,
        pixel_rect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn display_a() -> Display {
        Display {
            id: 1,
            frame: Rect::new(0.0, 0.0, 1920.0, 1080.0),
            scale_factor: 1.0,
        }
    }

    fn display_b() -> Display {
        Display {
            id: 2,
            frame: Rect::new(1920.0, 0.0, 1920.0, 1080.0),
            scale_factor: 2.0,
        }
    }

    #[test]
    fn flips_selection_on_primary_display() {
        let region =
            map_to_device_pixels(Rect::new(100.0, 800.0, 200.0, 100.0), &display_a()).unwrap();
        assert_eq!(region.source_rect, Rect::new(100.0, 180.0, 200.0, 100.0));
        assert_eq!(
            region.pixel_rect,
            PixelRect { x: 100, y: 180, width: 200, height: 100 }
        );
    }

    #[test]
    fn translates_and_scales_on_secondary_display() {
        let region =
            map_to_device_pixels(Rect::new(2020.0, 800.0, 200.0, 100.0), &display_b()).unwrap();
        assert_eq!(region.source_rect, Rect::new(100.0, 180.0, 200.0, 100.0));
        assert_eq!(region.pixel_rect.width, 400);
        assert_eq!(region.pixel_rect.height, 200);
        assert_eq!((region.pixel_rect.x, region.pixel_rect.y), (200, 360));
    }

    #[test]
    fn selection_at_top_edge_maps_to_zero_y() {
        let region =
            map_to_device_pixels(Rect::new(0.0, 980.0, 50.0, 100.0), &display_a()).unwrap();
        assert_eq!(region.source_rect.y, 0.0);
    }

    #[test]
    fn display_with_vertical_offset_is_translated_first() {
        let raised = Display {
            id: 3,
            frame: Rect::new(-1280.0, 1080.0, 1280.0, 800.0),
            scale_factor: 1.0,
        };
        let region =
            map_to_device_pixels(Rect::new(-1180.0, 1180.0, 300.0, 200.0), &raised).unwrap();
        // localY = 100, flippedY = 800 - 100 - 200
        assert_eq!(region.source_rect, Rect::new(100.0, 500.0, 300.0, 200.0));
    }

    #[test]
    fn rejects_degenerate_regions() {
        assert!(map_to_device_pixels(Rect::new(10.0, 10.0, 1.0, 1.0), &display_a()).is_none());
        assert!(map_to_device_pixels(Rect::new(10.0, 10.0, 300.0, 1.0), &display_a()).is_none());
        assert!(map_to_device_pixels(Rect::new(10.0, 10.0, 0.0, 300.0), &display_a()).is_none());
        assert!(map_to_device_pixels(Rect::new(10.0, 10.0, 1.5, 1.5), &display_a()).is_some());
    }

    #[test]
    fn fractional_scale_truncates_pixel_size() {
        let display = Display {
            scale_factor: 1.5,
            ..display_a()
        };
        let region = map_to_device_pixels(Rect::new(0.0, 0.0, 101.0, 33.0), &display).unwrap();
        assert_eq!(region.pixel_rect.width, 151);
        assert_eq!(region.pixel_rect.height, 49);
    }

    proptest! {
        #[test]
        fn flip_is_reversible_for_rects_inside_display(
            x in 0.0f64..1700.0,
            y in 0.0f64..900.0,
            w in 2.0f64..200.0,
            h in 2.0f64..150.0,
        ) {
            let display = display_b();
            let global = Rect::new(display.frame.x + x, display.frame.y + y, w, h);
            let region = map_to_device_pixels(global, &display).unwrap();

            let src = region.source_rect;
            prop_assert!(src.x >= 0.0 && src.max_x() <= display.frame.width + 1e-9);
            prop_assert!(src.y >= -1e-9 && src.max_y() <= display.frame.height + 1e-9);

            let back_y = display.frame.y + display.frame.height - src.y - src.height;
            prop_assert!((back_y - global.y).abs() < 1e-9);
        }

        #[test]
        fn pixel_size_never_zero(
            w in 1.01f64..4000.0,
            h in 1.01f64..4000.0,
            scale in 0.25f64..3.0,
        ) {
            let display = Display { scale_factor: scale, ..display_a() };
            let region = map_to_device_pixels(Rect::new(0.0, 0.0, w, h), &display).unwrap();
            prop_assert!(region.pixel_rect.width >= 1);
            prop_assert!(region.pixel_rect.height >= 1);
        }
    }
}
