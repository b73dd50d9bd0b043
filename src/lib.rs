//! # 剪贴板历史工具：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │        生命周期层 (main / 状态栏 / 快捷键 / 展示层)         │
//! │                                                          │
//! │   start_capture()   copy_out() / search() / subscribe()  │
//! └───────┬───────────────────────┬──────────────────────────┘
//!         ↓                       ↓
//! ┌───────┼───────────────────────┼──────────────────────────┐
//! │  ┌─ capture ─────────┐   ┌─ clipboard ──────────────┐    │
//! │  │ ScreenshotService │──→│ ClipboardService          │    │
//! │  │  ├─ session  状态机│   │  ├─ watcher  定时轮询     │    │
//! │  │  ├─ mapper   坐标  │   │  └─ system   arboard 适配 │    │
//! │  │  ├─ executor 流水线│   └──────────┬───────────────┘    │
//! │  │  └─ screens  xcap  │              ↓                    │
//! │  └───────────────────┘   ┌─ history ────────────────┐    │
//! │                          │ HistoryStore 去重/有界/通知 │    │
//! │                          └──────────┬───────────────┘    │
//! │  error  settings                    ↓                    │
//! │                          ┌─ db ─────────────────────┐    │
//! │                          │ PreferenceStore (rusqlite) │    │
//! │                          └──────────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`db`] | 键值偏好存储（SQLite / 内存） |
//! | [`history`] | 剪贴板条目模型、历史存储、搜索 |
//! | [`clipboard`] | 版本号轮询、自写入抑制、系统剪贴板适配 |
//! | [`capture`] | 截图会话、坐标映射、采集与写回 |
//! | [`settings`] | `settings.json` 读写与取值收敛 |

pub mod error;
pub mod db;
pub mod history;
pub mod clipboard;
pub mod capture;
pub mod settings;
