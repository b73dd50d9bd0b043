//! 应用设置
//!
//! 设置文件为数据目录下的 `settings.json`（camelCase）。缺失的字段使用默认值，
//! 文件不存在或无法解析时整体回退为默认设置，不会阻止启动。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::{
    CaptureOptions, DEFAULT_MIN_SELECTION_SIZE, DEFAULT_SETTLE_DELAY_MS, MIN_CAPTURE_EXTENT,
};
use crate::clipboard::{DEFAULT_POLL_INTERVAL_MS, normalize_poll_interval_ms};
use crate::error::AppError;
use crate::history::DEFAULT_CAPACITY;

pub const APP_DIR_NAME: &str = "paste-history";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

const MAX_HISTORY_CAPACITY: usize = 1000;
const MAX_SETTLE_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub history_capacity: usize,
    pub poll_interval_ms: u64,
    pub capture_settle_delay_ms: u64,
    pub min_selection_size: f64,
    /// 覆盖默认数据目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            capture_settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            min_selection_size: DEFAULT_MIN_SELECTION_SIZE,
            data_dir: None,
        }
    }
}

/// 平台默认数据目录
pub fn default_data_dir() -> Result<PathBuf, AppError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| AppError::Storage("无法确定用户数据目录".to_string()))
}

pub fn settings_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE_NAME)
}

impl AppSettings {
    /// 从数据目录读取设置
    pub fn load(data_dir: &Path) -> Self {
        let path = settings_file_path(data_dir);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("设置文件不存在，使用默认设置: {}", path.display());
                return Self::default();
            }
            Err(err) => {
                log::warn!("读取设置文件失败，使用默认设置: {}", err);
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(settings) => settings.normalized(),
            Err(err) => {
                log::warn!("解析设置文件失败，使用默认设置: {}", err);
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> Result<(), AppError> {
        fs::create_dir_all(data_dir)
            .map_err(|e| AppError::Storage(format!("创建数据目录失败: {}", e)))?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Storage(format!("序列化设置失败: {}", e)))?;
        fs::write(settings_file_path(data_dir), content)?;
        Ok(())
    }

    /// 把各项收敛到允许范围
    pub fn normalized(mut self) -> Self {
        self.history_capacity = self.history_capacity.clamp(1, MAX_HISTORY_CAPACITY);
        self.poll_interval_ms = normalize_poll_interval_ms(self.poll_interval_ms);
        self.capture_settle_delay_ms = self.capture_settle_delay_ms.min(MAX_SETTLE_DELAY_MS);
        if !self.min_selection_size.is_finite() || self.min_selection_size < MIN_CAPTURE_EXTENT {
            self.min_selection_size = DEFAULT_MIN_SELECTION_SIZE;
        }
        self
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            settle_delay: Duration::from_millis(self.capture_settle_delay_ms),
            min_selection_size: self.min_selection_size,
            ..CaptureOptions::default()
        }
    }
}
