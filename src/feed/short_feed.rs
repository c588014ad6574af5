//! 首页竖屏短视频流
//!
//! 对前 N 部短剧并发拉取剧集，每部取第一个能播放的剧集组成一项。
//! 单部失败只会让那一项缺席。成功的结果按分类持久化，网络不可用或
//! 一个可播放项都没有时退回到上一次的缓存。

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use indexmap::IndexSet;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::storage::{KeyValueStore, StorageError, get_json, set_json};
use crate::common::api::error::ApiError;
use crate::common::clock::{Clock, SystemClock};
use crate::common::config::ApiConfig;
use crate::common::models::{DramaFeedCategory, DramaItem, ShortFeedCachePayload, ShortFeedItem};
use crate::fetcher::{EpisodeSource, FetchOptions};
use crate::parser::normalize::normalize_cached_short_items;
use crate::parser::stream_utils::get_preferred_stream_url;

pub const SHORTS_CACHE_KEY_PREFIX: &str = "home_shorts_cache_v1";
pub const WATCHED_SHORTS_IDS_KEY: &str = "home_shorts_watched_ids_v1";

pub fn shorts_cache_key(category: DramaFeedCategory) -> String {
    format!("{}:{}", SHORTS_CACHE_KEY_PREFIX, category.as_segment())
}

/// 为一部短剧找到第一个可播放的剧集
async fn build_item<E>(source: &E, drama: &DramaItem, force_refresh: bool) -> Option<ShortFeedItem>
where
    E: EpisodeSource + ?Sized,
{
    let options = FetchOptions {
        force_refresh,
        cancel: None,
    };
    let episodes = match source.fetch_drama_episodes(&drama.book_id, options).await {
        Ok(episodes) => episodes,
        Err(e) => {
            debug!("短剧 {} 剧集加载失败，跳过: {}", drama.book_id, e);
            return None;
        }
    };

    let (episode, stream_url) = episodes
        .into_iter()
        .find_map(|episode| get_preferred_stream_url(&episode).map(|url| (episode, url)))?;

    Some(ShortFeedItem::new(drama.clone(), episode, stream_url))
}

/// 并发组装；输出顺序与输入一致，失败或无可播放剧集的短剧被丢弃
pub async fn assemble_short_items<E>(
    source: &E,
    dramas: &[DramaItem],
    max_dramas: usize,
    force_refresh: bool,
) -> Vec<ShortFeedItem>
where
    E: EpisodeSource + ?Sized,
{
    let candidates = &dramas[..dramas.len().min(max_dramas)];
    join_all(
        candidates
            .iter()
            .map(|drama| build_item(source, drama, force_refresh)),
    )
    .await
    .into_iter()
    .flatten()
    .collect()
}

/// 离线时展示的缓存项
///
/// 有观看记录时只展示看过的项；一个都匹配不上就展示全部缓存。
pub fn offline_items_from_cache(
    cached: &[ShortFeedItem],
    watched_ids: &IndexSet<String>,
) -> Vec<ShortFeedItem> {
    if cached.is_empty() {
        return Vec::new();
    }
    if watched_ids.is_empty() {
        return cached.to_vec();
    }

    let watched_only: Vec<ShortFeedItem> = cached
        .iter()
        .filter(|item| watched_ids.contains(&item.id))
        .cloned()
        .collect();
    if watched_only.is_empty() {
        cached.to_vec()
    } else {
        watched_only
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShortFeedSnapshot {
    pub items: Vec<ShortFeedItem>,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub is_using_offline_cache: bool,
    pub error: Option<String>,
    pub is_hydrated: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub refreshing: bool,
    pub force_refresh: bool,
}

#[derive(Debug, Default)]
struct FeedInner {
    snapshot: ShortFeedSnapshot,
    cached_items: Vec<ShortFeedItem>,
    watched_ids: IndexSet<String>,
    request_id: u64,
}

/// 单个分类的短视频流状态；切换分类时新建一个实例
pub struct ShortFeed {
    category: DramaFeedCategory,
    source: Arc<dyn EpisodeSource>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    max_dramas: usize,
    watched_ids_max: usize,
    inner: Mutex<FeedInner>,
}

impl ShortFeed {
    pub fn new(
        category: DramaFeedCategory,
        source: Arc<dyn EpisodeSource>,
        store: Arc<dyn KeyValueStore>,
        config: &ApiConfig,
    ) -> Self {
        let inner = FeedInner {
            snapshot: ShortFeedSnapshot {
                is_loading: true,
                ..Default::default()
            },
            ..Default::default()
        };
        Self {
            category,
            source,
            store,
            clock: Arc::new(SystemClock),
            max_dramas: config.max_dramas_in_shorts,
            watched_ids_max: config.watched_ids_max,
            inner: Mutex::new(inner),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn category(&self) -> DramaFeedCategory {
        self.category
    }

    fn lock(&self) -> MutexGuard<'_, FeedInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> ShortFeedSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn cached_items(&self) -> Vec<ShortFeedItem> {
        self.lock().cached_items.clone()
    }

    pub fn watched_ids(&self) -> Vec<String> {
        self.lock().watched_ids.iter().cloned().collect()
    }

    /// 从本地存储恢复观看记录和该分类的缓存，有缓存时立即展示
    pub async fn hydrate(&self) -> ShortFeedSnapshot {
        self.lock().snapshot.is_hydrated = false;

        let cache_key = shorts_cache_key(self.category);
        let (watched_raw, payload) = tokio::join!(
            get_json::<Value, _>(self.store.as_ref(), WATCHED_SHORTS_IDS_KEY),
            get_json::<Value, _>(self.store.as_ref(), &cache_key),
        );

        let watched_ids: IndexSet<String> = match watched_raw {
            Some(Value::Array(ids)) => ids
                .into_iter()
                .filter_map(|id| match id {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => IndexSet::new(),
        };
        let cached_items =
            normalize_cached_short_items(payload.as_ref().and_then(|p| p.get("items")));
        debug!(
            "恢复短视频缓存: 分类={}, 缓存 {} 项, 已看 {} 项",
            self.category,
            cached_items.len(),
            watched_ids.len()
        );

        let mut inner = self.lock();
        inner.watched_ids = watched_ids;
        if !cached_items.is_empty() {
            inner.snapshot.items = cached_items.clone();
            inner.snapshot.error = None;
            inner.snapshot.is_using_offline_cache = false;
            inner.snapshot.is_loading = false;
        }
        inner.cached_items = cached_items;
        inner.snapshot.is_hydrated = true;
        inner.snapshot.clone()
    }

    pub async fn build(
        &self,
        dramas: &[DramaItem],
        is_online: bool,
        options: BuildOptions,
    ) -> ShortFeedSnapshot {
        let request_id = {
            let mut inner = self.lock();
            if !inner.snapshot.is_hydrated {
                return inner.snapshot.clone();
            }
            inner.request_id += 1;
            if options.refreshing {
                inner.snapshot.is_refreshing = true;
            } else if inner.snapshot.items.is_empty() {
                inner.snapshot.is_loading = true;
            }
            inner.request_id
        };

        if !is_online {
            let mut inner = self.lock();
            let fallback = offline_items_from_cache(&inner.cached_items, &inner.watched_ids);
            if fallback.is_empty() {
                inner.snapshot.error = Some(ApiError::OfflineWithoutCache.to_string());
            } else {
                inner.snapshot.items = fallback;
                inner.snapshot.is_using_offline_cache = true;
                inner.snapshot.error = None;
            }
            return Self::finish(&mut inner, request_id);
        }

        if dramas.is_empty() {
            let mut inner = self.lock();
            if inner.cached_items.is_empty() {
                inner.snapshot.items.clear();
            } else {
                inner.snapshot.items = inner.cached_items.clone();
                inner.snapshot.is_using_offline_cache = true;
            }
            inner.snapshot.error = None;
            return Self::finish(&mut inner, request_id);
        }

        let playable = assemble_short_items(
            self.source.as_ref(),
            dramas,
            self.max_dramas,
            options.force_refresh,
        )
        .await;

        let to_persist = {
            let mut inner = self.lock();
            if request_id != inner.request_id {
                debug!("丢弃过期的短视频流结果 (请求 {})", request_id);
                return inner.snapshot.clone();
            }

            if !playable.is_empty() {
                info!("短视频流组装完成: {} 项", playable.len());
                inner.snapshot.items = playable.clone();
                inner.snapshot.error = None;
                inner.snapshot.is_using_offline_cache = false;
                inner.cached_items = playable.clone();
                Some(playable)
            } else if !inner.cached_items.is_empty() {
                warn!("没有可播放的短剧，使用上一次的缓存");
                inner.snapshot.items = inner.cached_items.clone();
                inner.snapshot.is_using_offline_cache = true;
                inner.snapshot.error = None;
                None
            } else {
                inner.snapshot.items.clear();
                inner.snapshot.error = Some(ApiError::NoPlayableShorts.to_string());
                None
            }
        };

        if let Some(items) = to_persist {
            let payload = ShortFeedCachePayload {
                saved_at: self.clock.now().timestamp_millis(),
                items,
            };
            let key = shorts_cache_key(self.category);
            if let Err(e) = set_json(self.store.as_ref(), &key, &payload).await {
                warn!("短视频缓存写入失败: {}", e);
            }
        }

        let mut inner = self.lock();
        Self::finish(&mut inner, request_id)
    }

    pub async fn refresh(&self, dramas: &[DramaItem], is_online: bool) -> ShortFeedSnapshot {
        self.build(
            dramas,
            is_online,
            BuildOptions {
                refreshing: true,
                force_refresh: true,
            },
        )
        .await
    }

    // 只有最新的请求才能结束加载状态
    fn finish(inner: &mut FeedInner, request_id: u64) -> ShortFeedSnapshot {
        if request_id == inner.request_id {
            inner.snapshot.is_loading = false;
            inner.snapshot.is_refreshing = false;
        }
        inner.snapshot.clone()
    }

    /// 记录已观看，只保留最近的若干条
    pub async fn mark_as_watched(&self, item_id: &str) -> Result<(), StorageError> {
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Ok(());
        }

        let persisted: Vec<String> = {
            let mut inner = self.lock();
            if !inner.watched_ids.insert(item_id.to_string()) {
                return Ok(());
            }
            let overflow = inner.watched_ids.len().saturating_sub(self.watched_ids_max);
            if overflow > 0 {
                inner.watched_ids.drain(..overflow);
            }
            inner.watched_ids.iter().cloned().collect()
        };

        set_json(self.store.as_ref(), WATCHED_SHORTS_IDS_KEY, &persisted).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize::{normalize_drama, normalize_episode};
    use serde_json::json;

    fn item(id: &str) -> ShortFeedItem {
        ShortFeedItem {
            id: id.to_string(),
            book_id: id.to_string(),
            drama_title: id.to_string(),
            drama: normalize_drama(&json!({"bookId": id})).unwrap(),
            episode: normalize_episode(&json!({})).unwrap(),
            stream_url: format!("https://cdn/{}.m3u8", id),
        }
    }

    #[test]
    fn test_offline_items_policy() {
        let cached = vec![item("a"), item("b"), item("c")];

        assert!(offline_items_from_cache(&[], &IndexSet::new()).is_empty());
        assert_eq!(offline_items_from_cache(&cached, &IndexSet::new()).len(), 3);

        let watched: IndexSet<String> = ["b".to_string()].into_iter().collect();
        let only = offline_items_from_cache(&cached, &watched);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id, "b");

        // 一个都匹配不上时退回全部
        let unrelated: IndexSet<String> = ["zzz".to_string()].into_iter().collect();
        assert_eq!(offline_items_from_cache(&cached, &unrelated).len(), 3);
    }

    #[test]
    fn test_cache_key_per_category() {
        assert_eq!(
            shorts_cache_key(DramaFeedCategory::ForYou),
            "home_shorts_cache_v1:for-you"
        );
    }
}
