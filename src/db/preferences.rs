//! 偏好存储后端
//!
//! - `SqlitePreferences`：`preferences(key, value, updated_at)` 单表 upsert
//! - `MemoryPreferences`：可克隆的共享句柄，克隆体之间看到同一份数据

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use super::{PreferenceStore, schema};
use crate::error::AppError;

/// 基于 SQLite 的偏好存储
pub struct SqlitePreferences {
    conn: Connection,
}

impl SqlitePreferences {
    /// 打开数据库文件并初始化 schema
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let conn = Connection::open(path)
            .map_err(|e| AppError::Persistence(format!("打开数据库失败: {}", e)))?;
        Self::from_connection(conn)
    }

    /// 打开内存数据库（进程退出即丢失）
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Persistence(format!("打开内存数据库失败: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, AppError> {
        schema::initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl PreferenceStore for SqlitePreferences {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        self.conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(|e| AppError::Persistence(format!("读取偏好 '{}' 失败: {}", key, e)))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), AppError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn
            .execute(
                "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE
                 SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .map_err(|e| AppError::Persistence(format!("写入偏好 '{}' 失败: {}", key, e)))?;
        Ok(())
    }
}

/// 进程内偏好存储
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("内存偏好存储锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), AppError> {
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
