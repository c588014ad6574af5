use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::common::api::client::DramaClient;
use crate::common::api::error::ApiError;
use crate::common::clock::{Clock, SystemClock};
use crate::common::models::DramaEpisode;

pub mod cache;
pub mod limiter;

use cache::EpisodeCache;
use limiter::EpisodeLimiter;

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub force_refresh: bool, // 跳过缓存读取，结果仍写回缓存
    pub cancel: Option<CancellationToken>,
}

impl FetchOptions {
    pub fn forced() -> Self {
        Self {
            force_refresh: true,
            cancel: None,
        }
    }
}

// 剧集列表的来源，短视频流组装只依赖这个 trait
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    async fn fetch_drama_episodes(
        &self,
        book_id: &str,
        options: FetchOptions,
    ) -> Result<Vec<DramaEpisode>, ApiError>;
}

/// 缓存 -> 并发槽位 -> 带超时的请求
#[derive(Clone)]
pub struct EpisodeService {
    client: DramaClient,
    cache: Arc<EpisodeCache>,
    limiter: EpisodeLimiter,
}

impl EpisodeService {
    pub fn new(client: DramaClient) -> Self {
        Self::with_clock(client, Arc::new(SystemClock))
    }

    pub fn with_clock(client: DramaClient, clock: Arc<dyn Clock>) -> Self {
        let config = client.config();
        let cache = EpisodeCache::with_clock(config.episodes_cache_ttl, clock);
        let limiter = EpisodeLimiter::new(config.episodes_concurrency);
        Self {
            client,
            cache: Arc::new(cache),
            limiter,
        }
    }

    pub fn cache(&self) -> &EpisodeCache {
        &self.cache
    }

    pub fn limiter(&self) -> &EpisodeLimiter {
        &self.limiter
    }
}

#[async_trait]
impl EpisodeSource for EpisodeService {
    async fn fetch_drama_episodes(
        &self,
        book_id: &str,
        options: FetchOptions,
    ) -> Result<Vec<DramaEpisode>, ApiError> {
        let book_id = book_id.trim();
        if book_id.is_empty() {
            return Err(ApiError::InvalidBookId);
        }

        if !options.force_refresh {
            if let Some(cached) = self.cache.get(book_id) {
                debug!("剧集缓存命中: {}", book_id);
                return Ok(cached);
            }
        }

        let cancel = options.cancel.as_ref();
        // 槽位在函数返回时释放
        let _slot = self.limiter.acquire_with_cancel(cancel).await?;
        debug!(
            "请求剧集: {} (在途 {}/{})",
            book_id,
            self.limiter.active(),
            self.limiter.limit()
        );

        let episodes = self.client.fetch_episodes_uncached(book_id, cancel).await?;
        self.cache.put(book_id, episodes.clone());
        Ok(episodes)
    }
}
