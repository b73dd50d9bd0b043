//! Schema 初始化子模块
//!
//! ## 职责
//! - 创建偏好表结构
//! - 设置 SQLite 运行参数（WAL）
//! - 通过 `PRAGMA user_version` 记录 schema 版本
//!
//! ## 错误语义
//! - DDL 失败统一映射为 `AppError::Persistence`

use rusqlite::Connection;

use crate::error::AppError;

pub(super) const SCHEMA_VERSION: i64 = 1;

pub(super) fn get_user_version(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| AppError::Persistence(format!("读取数据库版本失败: {}", e)))
}

fn set_user_version(conn: &Connection, version: i64) -> Result<(), AppError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| AppError::Persistence(format!("写入数据库版本失败: {}", e)))
}

fn create_base_tables(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS preferences (
            key TEXT PRIMARY KEY NOT NULL,
            value BLOB NOT NULL,
            updated_at INTEGER NOT NULL
        );",
    )
    .map_err(|e| AppError::Persistence(format!("创建偏好表失败: {}", e)))
}

/// 初始化数据库运行参数与表结构
///
/// 内存数据库不支持 WAL，`journal_mode` 设置失败时只记录日志。
pub(super) fn initialize_schema(conn: &Connection) -> Result<(), AppError> {
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        log::debug!("设置 WAL 模式失败，继续使用默认日志模式: {}", err);
    }

    create_base_tables(conn)?;

    let version = get_user_version(conn)?;
    if version < SCHEMA_VERSION {
        log::info!("偏好数据库 schema 升级: {} -> {}", version, SCHEMA_VERSION);
        set_user_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}
