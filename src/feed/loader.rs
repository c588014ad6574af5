use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::common::api::client::DramaClient;
use crate::common::api::error::ApiError;
use crate::common::models::{DramaEpisode, DramaFeedCategory, DramaItem};
use crate::fetcher::{EpisodeSource, FetchOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Failed,
    Ignored, // 被调用方取消，状态不变
}

/// 列表加载状态：数据、错误信息和上次成功时间
#[derive(Debug, Clone, PartialEq)]
pub struct LoadState<T> {
    pub data: T,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_loading: bool,
    pub is_refreshing: bool,
}

impl<T: Default> Default for LoadState<T> {
    fn default() -> Self {
        Self {
            data: T::default(),
            error: None,
            last_updated: None,
            is_loading: true,
            is_refreshing: false,
        }
    }
}

impl<T> LoadState<T> {
    pub fn begin(&mut self, refreshing: bool) {
        if refreshing {
            self.is_refreshing = true;
        } else {
            self.is_loading = true;
        }
    }

    /// 失败时保留上一次的数据；取消不覆盖任何内容
    pub fn apply(&mut self, result: Result<T, ApiError>, now: DateTime<Utc>) -> LoadOutcome {
        self.is_loading = false;
        self.is_refreshing = false;

        match result {
            Ok(data) => {
                self.data = data;
                self.error = None;
                self.last_updated = Some(now);
                LoadOutcome::Loaded
            }
            Err(e) if e.is_cancelled() => {
                debug!("加载被取消");
                LoadOutcome::Ignored
            }
            Err(e) => {
                error!("加载失败: {}", e);
                self.error = Some(e.to_string());
                LoadOutcome::Failed
            }
        }
    }

    pub fn fail(&mut self, e: ApiError) -> LoadOutcome {
        self.is_loading = false;
        self.is_refreshing = false;
        self.error = Some(e.to_string());
        LoadOutcome::Failed
    }
}

fn lock<T>(state: &Mutex<LoadState<T>>) -> MutexGuard<'_, LoadState<T>> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

// -----------------------------------------------------------------------------------------------

/// 单个分类的短剧列表
pub struct DramaFeedLoader {
    client: DramaClient,
    category: DramaFeedCategory,
    state: Mutex<LoadState<Vec<DramaItem>>>,
}

impl DramaFeedLoader {
    pub fn new(client: DramaClient, category: DramaFeedCategory) -> Self {
        Self {
            client,
            category,
            state: Mutex::new(LoadState::default()),
        }
    }

    pub fn state(&self) -> LoadState<Vec<DramaItem>> {
        lock(&self.state).clone()
    }

    pub fn dramas(&self) -> Vec<DramaItem> {
        lock(&self.state).data.clone()
    }

    pub async fn load(&self, cancel: Option<&CancellationToken>) -> LoadOutcome {
        self.run(false, cancel).await
    }

    pub async fn refresh(&self) -> LoadOutcome {
        self.run(true, None).await
    }

    async fn run(&self, refreshing: bool, cancel: Option<&CancellationToken>) -> LoadOutcome {
        lock(&self.state).begin(refreshing);
        let result = self.client.fetch_drama_feed(self.category, cancel).await;
        lock(&self.state).apply(result, Utc::now())
    }
}

// -----------------------------------------------------------------------------------------------

/// 某部短剧的剧集列表；refresh 会跳过缓存
pub struct EpisodeListLoader {
    source: Arc<dyn EpisodeSource>,
    book_id: String,
    state: Mutex<LoadState<Vec<DramaEpisode>>>,
}

impl EpisodeListLoader {
    pub fn new(source: Arc<dyn EpisodeSource>, book_id: &str) -> Self {
        Self {
            source,
            book_id: book_id.to_string(),
            state: Mutex::new(LoadState::default()),
        }
    }

    pub fn state(&self) -> LoadState<Vec<DramaEpisode>> {
        lock(&self.state).clone()
    }

    pub async fn load(&self, cancel: Option<CancellationToken>) -> LoadOutcome {
        self.run(
            false,
            FetchOptions {
                force_refresh: false,
                cancel,
            },
        )
        .await
    }

    pub async fn refresh(&self) -> LoadOutcome {
        self.run(true, FetchOptions::forced()).await
    }

    async fn run(&self, refreshing: bool, options: FetchOptions) -> LoadOutcome {
        if self.book_id.is_empty() {
            return lock(&self.state).fail(ApiError::MissingBookId);
        }

        lock(&self.state).begin(refreshing);
        let result = self
            .source
            .fetch_drama_episodes(&self.book_id, options)
            .await;
        lock(&self.state).apply(result, Utc::now())
    }
}
