//! 偏好存储模块
//!
//! # 设计思路
//!
//! 历史记录以单个序列化文档保存在键值偏好存储中的一个固定键下
//! （[`HISTORY_KEY`]）。核心只依赖
//! [`PreferenceStore`] trait，具体后端可替换：
//!
//! - [`SqlitePreferences`]：`rusqlite` 落盘实现，应用默认使用
//! - [`MemoryPreferences`]：进程内实现，供测试与 `--ephemeral` 模式使用
//!
//! # 实现思路
//!
//! - 值按原始字节存取，编码格式由调用方（`HistoryStore`）决定。
//! - 所有错误统一映射为 `AppError::Persistence`，由调用方决定是否吞掉。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

mod preferences;
mod schema;

pub use preferences::{MemoryPreferences, SqlitePreferences};

/// 历史记录在偏好存储中的固定键
pub const HISTORY_KEY: &str = "clipboardHistory";

/// 偏好数据库文件名
pub const DB_FILE_NAME: &str = "preferences.db";

/// 键值偏好存储
pub trait PreferenceStore: Send {
    /// 读取键对应的值，键不存在时返回 `Ok(None)`
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// 写入（覆盖）键对应的值
    fn set(&self, key: &str, value: &[u8]) -> Result<(), AppError>;
}

/// 计算数据目录下的偏好数据库路径
pub fn db_path_in(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE_NAME)
}

/// 在数据目录中打开（必要时创建）偏好数据库
///
/// 在 `main` 启动阶段调用；目录不存在时自动创建。
pub fn open_preferences(data_dir: &Path) -> Result<SqlitePreferences, AppError> {
    fs::create_dir_all(data_dir)
        .map_err(|e| AppError::Storage(format!("创建数据目录失败: {}", e)))?;

    let db_path = db_path_in(data_dir);
    log::info!("偏好数据库路径: {}", db_path.display());
    SqlitePreferences::open(&db_path)
}
