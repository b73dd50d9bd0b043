//! 截图会话状态机
//!
//! ## 设计思路
//!
//! 会话持有每块显示器一个覆盖层，状态完全由数据推导：
//! - 没有覆盖层 → `Idle`
//! - 有覆盖层、没有进行中的拖拽 → `Overlaying`
//! - 有覆盖层、某块显示器上正在拖拽 → `Selecting`
//!
//! ## 实现思路
//!
//! - 选区以覆盖层本地坐标记录，松开鼠标时再加上显示器原点转为全局坐标。
//! - 成功完成选区时，先同步关闭全部覆盖层再返回采集请求，
//!   调用方在此之后才会启动采集，覆盖层不会出现在截图里。
//! - 会话被丢弃时同样关闭覆盖层。

use std::sync::Arc;

use super::error::CaptureError;
use super::geometry::{Display, DisplayId, Point, Rect};

/// 选区宽或高不超过该值视为误触
pub const DEFAULT_MIN_SELECTION_SIZE: f64 = 2.0;

/// 覆盖层句柄（由覆盖层实现分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayHandle(pub u64);

/// 覆盖层外观
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// 选区外遮罩的不透明度（黑色）
    pub mask_alpha: f64,
    /// 选区边框的不透明度（白色）
    pub border_alpha: f64,
    pub border_width: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            mask_alpha: 0.3,
            border_alpha: 0.8,
            border_width: 1.5,
        }
    }
}

/// 覆盖层窗口能力
///
/// 实现方负责在显示器上创建置顶、无边框、接收鼠标事件的透明窗口，
/// 并把鼠标事件转换为覆盖层本地坐标后回调 `ScreenshotService`。
pub trait OverlayPort: Send + Sync {
    fn open(&self, display: &Display, style: &OverlayStyle) -> Result<OverlayHandle, CaptureError>;

    /// 重绘遮罩；`selection` 为覆盖层本地坐标，`None` 表示整屏遮罩
    fn repaint(&self, handle: OverlayHandle, selection: Option<Rect>);

    fn close(&self, handle: OverlayHandle);

    /// 把应用切到前台，让覆盖层直接接收鼠标与 Esc
    fn activate(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Overlaying,
    Selecting,
}

/// 完成选区后交给执行器的采集请求
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    /// 全局坐标（左下角原点）
    pub rect: Rect,
    pub display: Display,
}

/// 松开鼠标的处理结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerUp {
    /// 当前没有对应的拖拽
    Ignored,
    /// 选区过小，已清空，覆盖层保留，等待重新框选
    Retry,
    /// 覆盖层已全部关闭
    Finalized(CaptureRequest),
}

#[derive(Debug)]
struct Overlay {
    handle: OverlayHandle,
    display: Display,
}

pub struct CaptureSession {
    port: Arc<dyn OverlayPort>,
    style: OverlayStyle,
    min_selection_size: f64,
    overlays: Vec<Overlay>,
    active_display: Option<DisplayId>,
    selection_start: Option<Point>,
    selection_rect: Option<Rect>,
}

impl CaptureSession {
    pub fn new(port: Arc<dyn OverlayPort>) -> Self {
        Self::with_options(port, OverlayStyle::default(), DEFAULT_MIN_SELECTION_SIZE)
    }

    pub fn with_options(
        port: Arc<dyn OverlayPort>,
        style: OverlayStyle,
        min_selection_size: f64,
    ) -> Self {
        Self {
            port,
            style,
            min_selection_size,
            overlays: Vec::new(),
            active_display: None,
            selection_start: None,
            selection_rect: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        match (self.overlays.is_empty(), self.active_display) {
            (true, _) => CaptureState::Idle,
            (false, None) => CaptureState::Overlaying,
            (false, Some(_)) => CaptureState::Selecting,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.overlays.is_empty()
    }

    /// 当前选区（覆盖层本地坐标）
    pub fn selection(&self) -> Option<(DisplayId, Rect)> {
        self.active_display.zip(self.selection_rect)
    }

    /// 为每块显示器打开覆盖层
    ///
    /// 会话已在进行中时返回 `Ok(false)`，不会打开第二组覆盖层。
    pub fn start(&mut self, displays: &[Display]) -> Result<bool, CaptureError> {
        if self.is_active() {
            log::warn!("📸 截图会话已在进行中，忽略重复启动");
            return Ok(false);
        }
        if displays.is_empty() {
            return Err(CaptureError::Unavailable("没有已连接的显示器".to_string()));
        }

        for display in displays {
            match self.port.open(display, &self.style) {
                Ok(handle) => self.overlays.push(Overlay {
                    handle,
                    display: *display,
                }),
                Err(err) => {
                    log::error!("为显示器 {} 打开覆盖层失败: {}", display.id, err);
                    self.teardown();
                    return Err(err);
                }
            }
        }

        self.port.activate();
        log::info!("📸 截图覆盖层已打开（{} 块显示器）", self.overlays.len());
        Ok(true)
    }

    fn overlay(&self, display_id: DisplayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.display.id == display_id)
    }

    fn repaint(&self, display_id: DisplayId, selection: Option<Rect>) {
        if let Some(overlay) = self.overlay(display_id) {
            self.port.repaint(overlay.handle, selection);
        }
    }

    pub fn pointer_down(&mut self, display_id: DisplayId, point: Point) -> bool {
        let Some(bounds) = self.overlay(display_id).map(|o| o.display.local_bounds()) else {
            log::debug!("忽略显示器 {} 上的按下事件（无覆盖层）", display_id);
            return false;
        };

        if let Some(previous) = self.active_display.filter(|id| *id != display_id) {
            self.repaint(previous, None);
        }
        self.active_display = Some(display_id);
        self.selection_start = Some(bounds.clamp_point(point));
        self.selection_rect = None;
        self.repaint(display_id, None);
        true
    }

    fn drag_rect(&self, display_id: DisplayId, point: Point) -> Option<Rect> {
        if self.active_display != Some(display_id) {
            return None;
        }
        let start = self.selection_start?;
        let bounds = self.overlay(display_id)?.display.local_bounds();
        Some(Rect::from_points(start, bounds.clamp_point(point)))
    }

    pub fn pointer_dragged(&mut self, display_id: DisplayId, point: Point) -> Option<Rect> {
        let rect = self.drag_rect(display_id, point)?;
        self.selection_rect = Some(rect);
        self.repaint(display_id, Some(rect));
        Some(rect)
    }

    pub fn pointer_up(&mut self, display_id: DisplayId, point: Point) -> PointerUp {
        let Some(rect) = self.drag_rect(display_id, point) else {
            return PointerUp::Ignored;
        };

        if rect.width <= self.min_selection_size || rect.height <= self.min_selection_size {
            log::debug!("📸 选区 {}x{} 过小，等待重新框选", rect.width, rect.height);
            self.active_display = None;
            self.selection_start = None;
            self.selection_rect = None;
            self.repaint(display_id, None);
            return PointerUp::Retry;
        }

        let Some(display) = self.overlay(display_id).map(|o| o.display) else {
            return PointerUp::Ignored;
        };
        let request = CaptureRequest {
            rect: rect.offset(display.frame.x, display.frame.y),
            display,
        };

        self.teardown();
        log::info!(
            "📸 选区完成：显示器 {}，{}x{}",
            display.id,
            rect.width,
            rect.height
        );
        PointerUp::Finalized(request)
    }

    /// 取消截图（Esc 同样走这里），空闲时为无操作
    pub fn cancel(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.teardown();
        log::info!("📸 截图已取消");
        true
    }

    fn teardown(&mut self) {
        for overlay in self.overlays.drain(..) {
            self.port.close(overlay.handle);
        }
        self.active_display = None;
        self.selection_start = None;
        self.selection_rect = None;
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
