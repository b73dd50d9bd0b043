//! 剪贴板历史条目数据模型
//!
//! 条目创建后除 `pinned` 外均不可变：字段私有，只通过只读访问器暴露，
//! 置顶切换只对 `store` 子模块开放。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 条目唯一标识
pub type EntryId = Uuid;

/// 图片条目在列表与搜索中使用的固定占位文本
pub const IMAGE_PLACEHOLDER: &str = "[图片]";

/// 条目载荷：文本或图片二进制，二者必居其一
///
/// 序列化为 `{"type": "text", "value": "..."}`，图片字节以 Base64 字符串保存。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ClipContent {
    Text(String),
    Image(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl ClipContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }
}

/// 一次剪贴板快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardEntry {
    id: EntryId,
    content: ClipContent,
    created_at: DateTime<Utc>,
    pinned: bool,
}

impl ClipboardEntry {
    /// 以当前时间和新的随机 ID 创建条目，默认不置顶
    pub fn new(content: ClipContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            created_at: Utc::now(),
            pinned: false,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ClipContent::Text(text.into()))
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        Self::new(ClipContent::Image(bytes))
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn content(&self) -> &ClipContent {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// 展示 / 搜索用标签：文本原样返回，图片返回 [`IMAGE_PLACEHOLDER`]
    pub fn display_text(&self) -> &str {
        match &self.content {
            ClipContent::Text(text) => text,
            ClipContent::Image(_) => IMAGE_PLACEHOLDER,
        }
    }

    pub(super) fn toggle_pinned(&mut self) -> bool {
        self.pinned = !self.pinned;
        self.pinned
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
