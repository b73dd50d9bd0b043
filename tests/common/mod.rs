//! 集成测试共用的端口替身
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::RgbaImage;

use paste_history::capture::{
    CaptureError, DeviceRegion, Display, DisplayPort, OverlayHandle, OverlayPort, OverlayStyle,
    Rect, ScreenCapturer,
};
use paste_history::clipboard::{ChangeCount, ClipboardPort, ClipboardService, ImageFormat};
use paste_history::db::MemoryPreferences;
use paste_history::error::AppError;
use paste_history::history::HistoryStore;

/// 模拟系统剪贴板：任何写入都会推进版本号
#[derive(Default)]
pub struct FakeClipboard {
    state: Mutex<FakeClipboardState>,
}

#[derive(Default)]
struct FakeClipboardState {
    version: u64,
    text: Option<String>,
    image: Option<Vec<u8>>,
}

impl FakeClipboard {
    /// 模拟其他应用复制文本
    pub fn external_copy(&self, text: &str) {
        let mut state = self.state.lock().unwrap();
        state.version += 1;
        state.text = Some(text.to_string());
        state.image = None;
    }

    pub fn version(&self) -> u64 {
        self.state.lock().unwrap().version
    }

    pub fn text(&self) -> Option<String> {
        self.state.lock().unwrap().text.clone()
    }

    pub fn image(&self) -> Option<Vec<u8>> {
        self.state.lock().unwrap().image.clone()
    }
}

impl ClipboardPort for FakeClipboard {
    fn read_version(&self) -> Result<ChangeCount, AppError> {
        Ok(ChangeCount(self.version()))
    }

    fn read_text(&self) -> Result<Option<String>, AppError> {
        Ok(self.text())
    }

    fn write_text(&self, text: &str) -> Result<ChangeCount, AppError> {
        self.external_copy(text);
        self.read_version()
    }

    fn write_image(&self, png: &[u8], _formats: &[ImageFormat]) -> Result<ChangeCount, AppError> {
        let mut state = self.state.lock().unwrap();
        state.version += 1;
        state.text = None;
        state.image = Some(png.to_vec());
        Ok(ChangeCount(state.version))
    }
}

pub fn clipboard_service(capacity: usize) -> (Arc<FakeClipboard>, Arc<ClipboardService>) {
    let fake = Arc::new(FakeClipboard::default());
    let history = HistoryStore::load(Box::new(MemoryPreferences::new()), capacity);
    let service = Arc::new(ClipboardService::new(fake.clone(), history));
    (fake, service)
}

/// 记录覆盖层调用
#[derive(Default)]
pub struct RecordingOverlays {
    next_handle: AtomicUsize,
    pub open: Mutex<Vec<OverlayHandle>>,
    pub opened_total: AtomicUsize,
    pub activations: AtomicUsize,
    pub repaints: Mutex<Vec<(OverlayHandle, Option<Rect>)>>,
}

impl RecordingOverlays {
    pub fn open_count(&self) -> usize {
        self.open.lock().unwrap().len()
    }

    pub fn last_repaint(&self) -> Option<(OverlayHandle, Option<Rect>)> {
        self.repaints.lock().unwrap().last().copied()
    }
}

impl OverlayPort for RecordingOverlays {
    fn open(
        &self,
        _display: &Display,
        _style: &OverlayStyle,
    ) -> Result<OverlayHandle, CaptureError> {
        let handle = OverlayHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) as u64 + 1);
        self.open.lock().unwrap().push(handle);
        self.opened_total.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn repaint(&self, handle: OverlayHandle, selection: Option<Rect>) {
        self.repaints.lock().unwrap().push((handle, selection));
    }

    fn close(&self, handle: OverlayHandle) {
        self.open.lock().unwrap().retain(|h| *h != handle);
    }

    fn activate(&self) {
        self.activations.fetch_add(1, Ordering::SeqCst);
    }
}

/// 固定显示器列表 + 生成纯色位图的采集器
pub struct FakeScreens {
    pub displays: Mutex<Vec<Display>>,
    pub captures: Mutex<Vec<(u32, DeviceRegion)>>,
    pub permission_granted: bool,
    /// 采集时检查的覆盖层，记录每次采集瞬间仍打开的覆盖层数量
    observed_overlays: Option<Arc<RecordingOverlays>>,
    pub open_overlays_at_capture: Mutex<Vec<usize>>,
}

impl FakeScreens {
    pub fn new(displays: Vec<Display>) -> Self {
        Self {
            displays: Mutex::new(displays),
            captures: Mutex::new(Vec::new()),
            permission_granted: true,
            observed_overlays: None,
            open_overlays_at_capture: Mutex::new(Vec::new()),
        }
    }

    pub fn observe_overlays(&mut self, overlays: Arc<RecordingOverlays>) {
        self.observed_overlays = Some(overlays);
    }

    pub fn capture_count(&self) -> usize {
        self.captures.lock().unwrap().len()
    }
}

impl DisplayPort for FakeScreens {
    fn list_displays(&self) -> Result<Vec<Display>, CaptureError> {
        Ok(self.displays.lock().unwrap().clone())
    }
}

#[async_trait]
impl ScreenCapturer for FakeScreens {
    async fn ensure_permission(&self) -> Result<(), CaptureError> {
        if self.permission_granted {
            Ok(())
        } else {
            Err(CaptureError::Unavailable("屏幕录制权限被拒绝".into()))
        }
    }

    async fn capture(
        &self,
        display: &Display,
        region: &DeviceRegion,
    ) -> Result<RgbaImage, CaptureError> {
        if let Some(overlays) = &self.observed_overlays {
            let open = overlays.open_count();
            self.open_overlays_at_capture.lock().unwrap().push(open);
        }
        self.captures.lock().unwrap().push((display.id, *region));
        Ok(RgbaImage::from_pixel(
            region.pixel_rect.width,
            region.pixel_rect.height,
            image::Rgba([0, 128, 255, 255]),
        ))
    }
}

pub fn two_displays() -> Vec<Display> {
    vec![
        Display {
            id: 1,
            frame: Rect::new(0.0, 0.0, 1920.0, 1080.0),
            scale_factor: 1.0,
        },
        Display {
            id: 2,
            frame: Rect::new(1920.0, 0.0, 1920.0, 1080.0),
            scale_factor: 2.0,
        },
    ]
}
