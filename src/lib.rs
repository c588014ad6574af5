//! 短剧内容 API 的客户端编排层
//!
//! - `common`: HTTP 客户端、超时、配置、数据模型
//! - `parser`: 响应归一化、播放流选择、展示用格式化
//! - `fetcher`: 剧集缓存与并发限制
//! - `feed`: 分类列表、首页短视频流与本地持久化
//! - `search`: 防抖搜索

pub mod common;
pub mod feed;
pub mod fetcher;
pub mod parser;
pub mod search;

pub use common::api::client::DramaClient;
pub use common::api::error::ApiError;
pub use common::config::ApiConfig;
pub use common::models::{
    DramaEpisode, DramaFeedCategory, DramaItem, DramaSearchItem, ShortFeedItem,
};
pub use fetcher::{EpisodeService, EpisodeSource, FetchOptions};
