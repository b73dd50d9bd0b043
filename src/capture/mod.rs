//! 区域截图模块
//!
//! # 设计思路
//!
//! 截图分为交互与执行两段：
//!
//! - **交互**（`session`）：同步状态机，管理每块显示器的覆盖层与拖拽选区
//! - **执行**（`executor`）：异步流水线，覆盖层关闭后等待稳定延迟，
//!   映射坐标（`mapper`）、采集、编码，并经 `ClipboardService` 写回剪贴板
//!
//! 两段之间只传递一个 `CaptureRequest` 值。会话锁在进入异步执行前释放，
//! 但从松开鼠标到写回剪贴板结束，服务一直标记为采集中：
//! 这段时间内的新截图请求会被拒绝，新覆盖层不会出现在本次截图里。
//!
//! # 实现思路
//!
//! - `OverlayPort` / `DisplayPort` / `ScreenCapturer` 抽象平台能力，核心逻辑可以
//!   在没有窗口系统的环境下测试。
//! - `screens` 提供基于 `xcap` 的真实显示器与采集实现。
//! - 所有失败在本模块内记录日志后消化，会话总是回到 `Idle`。

mod error;
mod executor;
mod geometry;
mod mapper;
mod region;
mod screens;
mod session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub use error::CaptureError;
pub use executor::{
    CaptureExecutor, CaptureOutcome, DEFAULT_SETTLE_DELAY_MS, DisplayPort, ScreenCapturer,
};
pub use geometry::{Display, DisplayId, Point, Rect, find_display_at};
pub use mapper::{
    DeviceRegion, MIN_CAPTURE_EXTENT, PixelRect, map_to_device_pixels, to_display_local,
};
pub use region::{crop_region, encode_png, fit_to_size};
pub use screens::XcapScreens;
pub use session::{
    CaptureRequest, CaptureSession, CaptureState, DEFAULT_MIN_SELECTION_SIZE, OverlayHandle,
    OverlayPort, OverlayStyle, PointerUp,
};

use crate::clipboard::ClipboardService;

/// 截图服务参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    pub settle_delay: Duration,
    pub min_selection_size: f64,
    pub style: OverlayStyle,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            min_selection_size: DEFAULT_MIN_SELECTION_SIZE,
            style: OverlayStyle::default(),
        }
    }
}

/// 截图服务：由生命周期层构造一次，通过 `Arc` 共享给快捷键、菜单与覆盖层回调
pub struct ScreenshotService {
    session: Mutex<CaptureSession>,
    capturing: AtomicBool,
    displays: Arc<dyn DisplayPort>,
    executor: CaptureExecutor,
}

/// 采集中标记，离开作用域时清除
struct CaptureInFlight<'a>(&'a AtomicBool);

impl Drop for CaptureInFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScreenshotService {
    pub fn new(
        displays: Arc<dyn DisplayPort>,
        overlays: Arc<dyn OverlayPort>,
        capturer: Arc<dyn ScreenCapturer>,
        clipboard: Arc<ClipboardService>,
        options: CaptureOptions,
    ) -> Self {
        let session =
            CaptureSession::with_options(overlays, options.style, options.min_selection_size);
        let executor = CaptureExecutor::new(
            Arc::clone(&displays),
            capturer,
            clipboard,
            options.settle_delay,
        );
        Self {
            session: Mutex::new(session),
            capturing: AtomicBool::new(false),
            displays,
            executor,
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, CaptureSession> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("截图会话锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    fn try_begin_capture(&self) -> Option<CaptureInFlight<'_>> {
        self.capturing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CaptureInFlight(&self.capturing))
    }

    pub fn state(&self) -> CaptureState {
        self.lock_session().state()
    }

    /// 是否有截图正在等待稳定延迟、采集或写回
    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    /// 开始截图（快捷键 / 菜单入口）
    ///
    /// 已有会话进行中、上一次截图尚未写回、没有显示器或覆盖层打开失败时返回 `false`。
    pub fn start_capture(&self) -> bool {
        let mut session = self.lock_session();
        if session.is_active() {
            log::warn!("📸 截图会话已在进行中，忽略重复启动");
            return false;
        }
        if self.is_capturing() {
            log::warn!("📸 上一次截图尚未完成，忽略启动");
            return false;
        }

        let displays = match self.displays.list_displays() {
            Ok(displays) => displays,
            Err(err) => {
                log::error!("枚举显示器失败: {}", err);
                return false;
            }
        };

        match session.start(&displays) {
            Ok(started) => started,
            Err(err) => {
                log::error!("启动截图失败: {}", err);
                false
            }
        }
    }

    pub fn cancel_capture(&self) -> bool {
        self.lock_session().cancel()
    }

    pub fn pointer_down(&self, display: DisplayId, point: Point) -> bool {
        self.lock_session().pointer_down(display, point)
    }

    pub fn pointer_dragged(&self, display: DisplayId, point: Point) -> Option<Rect> {
        self.lock_session().pointer_dragged(display, point)
    }

    /// 松开鼠标；选区有效时执行截图
    ///
    /// 返回 `Ok(None)` 表示本次松开没有触发截图（无拖拽或选区过小）。
    /// 执行失败会记录日志并返回错误，此时会话已经是 `Idle`。
    pub async fn pointer_up(
        &self,
        display: DisplayId,
        point: Point,
    ) -> Result<Option<CaptureOutcome>, CaptureError> {
        let (request, in_flight) = {
            let mut session = self.lock_session();
            match session.pointer_up(display, point) {
                PointerUp::Ignored | PointerUp::Retry => return Ok(None),
                PointerUp::Finalized(request) => (request, self.try_begin_capture()),
            }
        };
        let Some(_in_flight) = in_flight else {
            log::warn!("📸 上一次截图尚未完成，丢弃本次选区");
            return Err(CaptureError::Busy);
        };
        self.execute_logged(request).await.map(Some)
    }

    /// 跳过交互直接采集全局坐标区域
    ///
    /// 已有截图在执行时返回 `CaptureError::Busy`。
    pub async fn capture_region(
        &self,
        request: CaptureRequest,
    ) -> Result<CaptureOutcome, CaptureError> {
        let Some(_in_flight) = self.try_begin_capture() else {
            log::warn!("📸 上一次截图尚未完成，忽略本次请求");
            return Err(CaptureError::Busy);
        };
        self.execute_logged(request).await
    }

    async fn execute_logged(
        &self,
        request: CaptureRequest,
    ) -> Result<CaptureOutcome, CaptureError> {
        let result = self.executor.execute(request).await;
        if let Err(err) = &result {
            log::error!("📸 截图失败: {}", err);
        }
        result
    }
}
