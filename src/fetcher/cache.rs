use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::common::clock::{Clock, SystemClock};
use crate::common::models::DramaEpisode;

#[derive(Debug, Clone)]
struct CacheRecord {
    expires_at: DateTime<Utc>,
    data: Vec<DramaEpisode>,
}

/// bookId -> 剧集列表，带固定 TTL
///
/// 过期记录不会被返回，在下一次读取时惰性删除。写入以最后一次为准。
pub struct EpisodeCache {
    entries: DashMap<String, CacheRecord>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl EpisodeCache {
    pub fn new(ttl: TimeDelta) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn get(&self, book_id: &str) -> Option<Vec<DramaEpisode>> {
        let now = self.clock.now();
        if self
            .entries
            .remove_if(book_id, |_, record| now > record.expires_at)
            .is_some()
        {
            debug!("剧集缓存已过期并清除: {}", book_id);
            return None;
        }
        self.entries.get(book_id).map(|record| record.data.clone())
    }

    pub fn put(&self, book_id: &str, data: Vec<DramaEpisode>) {
        let expires_at = self.clock.now() + self.ttl;
        self.entries
            .insert(book_id.to_string(), CacheRecord { expires_at, data });
    }

    pub fn invalidate(&self, book_id: &str) {
        self.entries.remove(book_id);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    // 包含尚未被惰性清除的过期记录
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
