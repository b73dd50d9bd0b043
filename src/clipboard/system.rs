//! 基于 `arboard` 的系统剪贴板适配器
//!
//! ## 设计思路
//!
//! 版本号优先使用平台原生计数器：
//! - Windows：`GetClipboardSequenceNumber`
//! - macOS：`NSPasteboard.changeCount`
//!
//! 其他平台（X11 / Wayland）没有可移植的计数器，适配器自行合成：
//! 每次 `read_version` 计算当前**文本**指纹，指纹变化即版本号 +1；
//! 自身写入完成后立即刷新指纹并 +1，把写入后的版本号返回给调用方。
//! 合成版本号只读取文本，剪贴板里放着图片时不会每次轮询都解码整张位图。
//!
//! ## 实现思路
//!
//! - `arboard::Clipboard` 由专用工作线程独占持有，调用方通过任务通道投递操作。
//!   适配器被丢弃时关闭任务通道并等待工作线程退出，X11 / Wayland 下
//!   `Clipboard` 的析构会把内容交接给剪贴板管理器，一次性写入不会随进程退出丢失。
//! - 写入失败按指数退避有限重试。

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::mpsc;
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arboard::{Clipboard, ImageData};

use super::{ChangeCount, ClipboardPort, ImageFormat};
use crate::error::AppError;

const WRITE_RETRIES: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 100;
const RETRY_MAX_DELAY_MS: u64 = 900;

fn compute_retry_delay_ms(attempt: u32) -> u64 {
    let exp = 1_u64 << attempt.saturating_sub(1).min(8);
    RETRY_BASE_DELAY_MS.saturating_mul(exp).min(RETRY_MAX_DELAY_MS)
}

fn fingerprint_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// 文本读取结果 → 指纹；没有文本（包括只有图片）记为 `None`
fn text_fingerprint(read: Result<String, arboard::Error>) -> Result<Option<u64>, String> {
    match read {
        Ok(text) => Ok(Some(fingerprint_text(&text))),
        Err(arboard::Error::ContentNotAvailable | arboard::Error::ConversionFailure) => Ok(None),
        Err(err) => Err(err.to_string()),
    }
}

fn is_retryable(err: &arboard::Error) -> bool {
    matches!(
        err,
        arboard::Error::ClipboardOccupied | arboard::Error::Unknown { .. }
    )
}

fn write_with_retry(
    label: &str,
    mut op: impl FnMut() -> Result<(), arboard::Error>,
) -> Result<(), String> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(()) => return Ok(()),
            Err(err) if attempt < WRITE_RETRIES && is_retryable(&err) => {
                attempt += 1;
                let delay_ms = compute_retry_delay_ms(attempt);
                log::warn!(
                    "写入{}到剪贴板失败，{}ms 后重试（attempt={}）: {}",
                    label,
                    delay_ms,
                    attempt,
                    err
                );
                thread::sleep(Duration::from_millis(delay_ms));
            }
            Err(err) => return Err(format!("写入{}失败: {}", label, err)),
        }
    }
}

/// 平台原生剪贴板计数器
#[cfg(windows)]
fn native_change_count() -> Option<u64> {
    use windows::Win32::System::DataExchange::GetClipboardSequenceNumber;

    // 没有剪贴板访问权限时返回 0
    match unsafe { GetClipboardSequenceNumber() } {
        0 => None,
        count => Some(u64::from(count)),
    }
}

#[cfg(target_os = "macos")]
fn native_change_count() -> Option<u64> {
    use cocoa::base::{id, nil};
    use cocoa::foundation::NSInteger;
    use objc::rc::autoreleasepool;
    use objc::{class, msg_send, sel, sel_impl};

    autoreleasepool(|| unsafe {
        let pasteboard: id = msg_send![class!(NSPasteboard), generalPasteboard];
        if pasteboard == nil {
            return None;
        }
        let count: NSInteger = msg_send![pasteboard, changeCount];
        u64::try_from(count).ok()
    })
}

#[cfg(not(any(windows, target_os = "macos")))]
fn native_change_count() -> Option<u64> {
    None
}

type Job<C> = Box<dyn FnOnce(&mut C) + Send>;

/// 独占持有某个资源的工作线程
///
/// 资源在线程内创建、使用和析构；丢弃时关闭任务通道并等待线程退出。
struct OwnerThread<C> {
    jobs: Option<mpsc::Sender<Job<C>>>,
    handle: Option<JoinHandle<()>>,
}

impl<C: 'static> OwnerThread<C> {
    fn spawn<F>(name: &str, init: F) -> Result<Self, AppError>
    where
        F: FnOnce() -> Result<C, String> + Send + 'static,
    {
        let (jobs, receiver) = mpsc::channel::<Job<C>>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            let mut resource = match init() {
                Ok(resource) => {
                    let _ = ready_tx.send(Ok(()));
                    resource
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            while let Ok(job) = receiver.recv() {
                job(&mut resource);
            }
            drop(resource);
            log::debug!("📋 剪贴板工作线程退出");
        })?;

        let started = ready_rx
            .recv()
            .map_err(|_| AppError::Clipboard("剪贴板工作线程启动失败".to_string()))?;
        let owner = Self {
            jobs: Some(jobs),
            handle: Some(handle),
        };
        started.map_err(|e| AppError::Clipboard(format!("打开系统剪贴板失败: {}", e)))?;
        Ok(owner)
    }

    /// 在工作线程上执行一次操作并等待结果
    fn run<T, F>(&self, op: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut C) -> T + Send + 'static,
    {
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| AppError::Clipboard("剪贴板工作线程已退出".to_string()))?;
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        jobs.send(Box::new(move |resource: &mut C| {
            let _ = reply_tx.send(op(resource));
        }))
        .map_err(|_| AppError::Clipboard("剪贴板工作线程已退出".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| AppError::Clipboard("剪贴板工作线程未返回结果".to_string()))
    }
}

impl<C> Drop for OwnerThread<C> {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("剪贴板工作线程异常退出");
            }
        }
    }
}

#[derive(Debug)]
struct VersionState {
    version: u64,
    fingerprint: Option<u64>,
}

/// 系统剪贴板
pub struct ArboardClipboard {
    worker: OwnerThread<Clipboard>,
    state: Mutex<VersionState>,
}

impl ArboardClipboard {
    /// 启动剪贴板工作线程，并以当前内容作为版本基线
    pub fn new() -> Result<Self, AppError> {
        let worker = OwnerThread::spawn("clipboard-worker", || {
            Clipboard::new().map_err(|e| e.to_string())
        })?;

        let adapter = Self {
            worker,
            state: Mutex::new(VersionState {
                version: 0,
                fingerprint: None,
            }),
        };
        if native_change_count().is_none() {
            let baseline = adapter.read_fingerprint()?;
            adapter.lock_state().fingerprint = baseline;
        }
        Ok(adapter)
    }

    fn lock_state(&self) -> MutexGuard<'_, VersionState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("剪贴板版本状态锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    fn read_fingerprint(&self) -> Result<Option<u64>, AppError> {
        self.worker
            .run(|clipboard| text_fingerprint(clipboard.get_text()))?
            .map_err(|e| AppError::Clipboard(format!("读取剪贴板失败: {}", e)))
    }

    /// 自写入完成后返回写入后的版本号
    fn commit_self_write(&self) -> Result<ChangeCount, AppError> {
        if let Some(count) = native_change_count() {
            return Ok(ChangeCount(count));
        }
        let fingerprint = self.read_fingerprint()?;
        let mut state = self.lock_state();
        state.version += 1;
        state.fingerprint = fingerprint;
        Ok(ChangeCount(state.version))
    }
}

impl ClipboardPort for ArboardClipboard {
    fn read_version(&self) -> Result<ChangeCount, AppError> {
        if let Some(count) = native_change_count() {
            return Ok(ChangeCount(count));
        }
        let fingerprint = self.read_fingerprint()?;
        let mut state = self.lock_state();
        if state.fingerprint != fingerprint {
            state.version += 1;
            state.fingerprint = fingerprint;
        }
        Ok(ChangeCount(state.version))
    }

    fn read_text(&self) -> Result<Option<String>, AppError> {
        self.worker
            .run(|clipboard| match clipboard.get_text() {
                Ok(text) => Ok(Some(text)),
                Err(arboard::Error::ContentNotAvailable) => Ok(None),
                Err(err) => Err(err.to_string()),
            })?
            .map_err(|e| AppError::Clipboard(format!("读取剪贴板文本失败: {}", e)))
    }

    fn write_text(&self, text: &str) -> Result<ChangeCount, AppError> {
        let owned = text.to_string();
        self.worker
            .run(move |clipboard| write_with_retry("文本", || clipboard.set_text(owned.as_str())))?
            .map_err(AppError::Clipboard)?;
        self.commit_self_write()
    }

    /// `arboard` 只接受 RGBA 位图，`formats` 不会逐一写入，
    /// 由平台层在写入时转换为 PNG / TIFF 等原生表示
    fn write_image(&self, png: &[u8], formats: &[ImageFormat]) -> Result<ChangeCount, AppError> {
        let rgba = image::load_from_memory(png)
            .map_err(|e| AppError::Clipboard(format!("解码 PNG 失败: {}", e)))?
            .to_rgba8();
        let (width, height) = (rgba.width() as usize, rgba.height() as usize);
        let bytes = rgba.into_raw();
        log::debug!("📋 写入图片 {}x{}，请求格式 {:?}", width, height, formats);

        self.worker
            .run(move |clipboard| {
                write_with_retry("图片", || {
                    clipboard.set_image(ImageData {
                        width,
                        height,
                        bytes: Cow::Borrowed(bytes.as_slice()),
                    })
                })
            })?
            .map_err(AppError::Clipboard)?;
        self.commit_self_write()
    }
}
