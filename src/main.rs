//! # 剪贴板历史工具：应用入口
//!
//! 本文件负责生命周期装配：日志、设置、偏好存储、剪贴板与截图服务的构造，
//! 以及命令行子命令分发。业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::{broadcast, watch};

use paste_history::capture::{
    CaptureError, CaptureExecutor, CaptureRequest, DisplayPort, Point, Rect, XcapScreens,
    find_display_at,
};
use paste_history::clipboard::{ArboardClipboard, ClipboardService, ClipboardWatcher};
use paste_history::db::{self, MemoryPreferences, PreferenceStore};
use paste_history::error::AppError;
use paste_history::history::{ClipboardEntry, EntryId, HistoryEvent, HistoryFilter, HistoryStore};
use paste_history::settings::{self, AppSettings};

#[derive(Parser)]
#[command(name = "paste-history")]
#[command(about = "Clipboard history engine with region screenshot capture", long_about = None)]
struct Cli {
    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep history in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the clipboard and record history (default mode)
    Watch,
    /// List history entries, newest first
    List {
        /// Case-insensitive substring filter
        #[arg(short, long)]
        search: Option<String>,
        /// Only show pinned entries
        #[arg(short, long)]
        pinned: bool,
    },
    /// Copy an entry back to the clipboard
    Copy { id: EntryId },
    /// Toggle the pinned flag of an entry (stop a running `watch` first)
    ///
    /// A running `watch` process keeps its own copy of the history and
    /// overwrites this edit on its next change.
    Pin { id: EntryId },
    /// Delete an entry (stop a running `watch` first)
    ///
    /// A running `watch` process keeps its own copy of the history and
    /// overwrites this edit on its next change.
    Delete { id: EntryId },
    /// Remove every entry (stop a running `watch` first)
    ///
    /// A running `watch` process keeps its own copy of the history and
    /// overwrites this edit on its next change.
    Clear,
    /// List connected displays
    Displays,
    /// Capture a region (global, bottom-left origin) to the clipboard
    Capture {
        /// Target display; defaults to the display containing the origin
        #[arg(long)]
        display: Option<u32>,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let base_dir = match cli.data_dir.clone() {
        Some(dir) => dir,
        None => settings::default_data_dir()?,
    };
    let app_settings = AppSettings::load(&base_dir);
    let data_dir = app_settings.data_dir.clone().unwrap_or(base_dir);
    log::info!("数据目录: {}", data_dir.display());

    let backend: Box<dyn PreferenceStore> = if cli.ephemeral {
        log::info!("临时模式：历史记录仅保存在内存中");
        Box::new(MemoryPreferences::new())
    } else {
        Box::new(db::open_preferences(&data_dir)?)
    };
    let mut history = HistoryStore::load(backend, app_settings.history_capacity);

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => run_watch(history, &app_settings).await?,
        Commands::List { search, pinned } => {
            let filter = HistoryFilter::search(search.unwrap_or_default()).pinned_only(pinned);
            for entry in history.search(&filter) {
                println!("{}", format_entry(&entry));
            }
        }
        Commands::Copy { id } => {
            let service = ClipboardService::new(Arc::new(ArboardClipboard::new()?), history);
            match service.copy_out(id)? {
                Some(_) => println!("已复制 {}", id),
                None => println!("条目不存在: {}", id),
            }
        }
        Commands::Pin { id } => match history.toggle_pin(id) {
            Some(pinned) => println!("{} {}", id, if pinned { "已置顶" } else { "已取消置顶" }),
            None => println!("条目不存在: {}", id),
        },
        Commands::Delete { id } => {
            if history.delete(id) {
                println!("已删除 {}", id);
            } else {
                println!("条目不存在: {}", id);
            }
        }
        Commands::Clear => {
            history.clear();
            println!("历史记录已清空");
        }
        Commands::Displays => {
            let displays = XcapScreens::new().list_displays()?;
            let json = serde_json::to_string_pretty(&displays)
                .map_err(|e| AppError::Storage(format!("序列化显示器列表失败: {}", e)))?;
            println!("{}", json);
        }
        Commands::Capture {
            display,
            x,
            y,
            width,
            height,
        } => {
            let rect = Rect::new(x, y, width, height);
            run_capture(history, &app_settings, display, rect).await?;
        }
    }

    Ok(())
}

fn format_entry(entry: &ClipboardEntry) -> String {
    let label: String = entry
        .display_text()
        .chars()
        .take(80)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    format!(
        "{}  {}  {}  {}",
        entry.id(),
        if entry.is_pinned() { "★" } else { " " },
        entry.created_at().format("%Y-%m-%d %H:%M:%S"),
        label
    )
}

async fn run_watch(history: HistoryStore, app_settings: &AppSettings) -> Result<(), AppError> {
    let clipboard = Arc::new(ArboardClipboard::new()?);
    let service = Arc::new(ClipboardService::new(clipboard, history));
    let mut events = service.subscribe();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher =
        ClipboardWatcher::new(Arc::clone(&service), app_settings.poll_interval_ms).spawn(shutdown_rx);

    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(HistoryEvent::Inserted(id)) => log::info!("📋 新条目 {}", id),
                Ok(event) => log::debug!("📋 历史变更: {:?}", event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("历史事件积压，跳过 {} 条", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("监听退出信号失败: {}", err);
    }
    log::info!("收到退出信号，停止监听");

    let _ = shutdown_tx.send(true);
    if let Err(err) = watcher.await {
        log::error!("剪贴板轮询任务异常退出: {}", err);
    }
    reporter.abort();
    Ok(())
}

async fn run_capture(
    history: HistoryStore,
    app_settings: &AppSettings,
    display_id: Option<u32>,
    rect: Rect,
) -> Result<(), AppError> {
    let screens = Arc::new(XcapScreens::new());
    let displays = screens.list_displays()?;
    let display = match display_id {
        Some(id) => displays.iter().find(|d| d.id == id),
        None => find_display_at(Point::new(rect.x, rect.y), &displays),
    }
    .copied()
    .ok_or_else(|| CaptureError::DisplayNotFound(display_id.unwrap_or_default()))?;

    let clipboard = Arc::new(ClipboardService::new(Arc::new(ArboardClipboard::new()?), history));
    let executor = CaptureExecutor::new(
        screens.clone(),
        screens,
        clipboard,
        app_settings.capture_options().settle_delay,
    );
    let outcome = executor.execute(CaptureRequest { rect, display }).await?;
    println!(
        "截图已写入剪贴板：{}x{} 像素，{} 字节",
        outcome.pixel_rect.width, outcome.pixel_rect.height, outcome.png_len
    );
    Ok(())
}
