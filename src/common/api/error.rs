use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    // 调用方主动取消（切换页面、输入新关键字），上层静默丢弃
    #[error("请求已取消")]
    Cancelled,

    #[error("请求超时 ({0:?})")]
    Timeout(Duration),

    #[error("网络请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{context} 加载失败，状态码: {status}")]
    Status { status: StatusCode, context: String },

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("响应格式无效: {0}")]
    InvalidShape(String),

    #[error("并发槽位已关闭")]
    LimiterClosed,

    #[error("无效的 bookId")]
    InvalidBookId,

    #[error("bookId 缺失")]
    MissingBookId,

    #[error("暂无可播放的短剧")]
    NoPlayableShorts,

    #[error("离线模式：缓存中还没有短剧")]
    OfflineWithoutCache,
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidShape(e.to_string())
    }
}
