//! 搜索：防抖 + 请求代号防止旧响应覆盖新结果
//!
//! 状态流转：idle（空关键字）-> pending（计时中）-> in-flight（请求已发出）。
//! 每次输入都会让代号加一，取消上一个计时器和在途请求；
//! 只有代号与当前一致的响应才会写入状态。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::common::api::client::DramaClient;
use crate::common::api::error::ApiError;
use crate::common::models::{DramaItem, DramaSearchItem};

#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search(
        &self,
        keyword: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<DramaSearchItem>, ApiError>;

    async fn popular(&self, cancel: Option<&CancellationToken>) -> Result<Vec<DramaItem>, ApiError>;
}

#[async_trait]
impl SearchSource for DramaClient {
    async fn search(
        &self,
        keyword: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<DramaSearchItem>, ApiError> {
        self.fetch_drama_search(keyword, cancel).await
    }

    async fn popular(&self, cancel: Option<&CancellationToken>) -> Result<Vec<DramaItem>, ApiError> {
        self.fetch_popular_searches(cancel).await
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Pending,
    InFlight,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSnapshot {
    pub query: String,
    pub generation: u64,
    pub phase: SearchPhase,
    pub results: Vec<DramaSearchItem>,
    pub is_searching: bool,
    pub search_error: Option<String>,

    pub popular: Vec<DramaItem>,
    pub is_loading_popular: bool,
    pub popular_error: Option<String>,
}

/// 必须在 tokio 运行时内创建：热门搜索在创建时就开始加载，防抖计时也在后台任务里进行
pub struct SearchController {
    source: Arc<dyn SearchSource>,
    debounce: Duration,
    current: Mutex<Option<CancellationToken>>,
    popular_cancel: CancellationToken,
    state: Arc<watch::Sender<SearchSnapshot>>,
}

impl SearchController {
    pub fn new(source: Arc<dyn SearchSource>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(SearchSnapshot {
            is_loading_popular: true,
            ..Default::default()
        });
        let state = Arc::new(state);
        let popular_cancel = CancellationToken::new();

        tokio::spawn({
            let source = Arc::clone(&source);
            let state = Arc::clone(&state);
            let cancel = popular_cancel.clone();
            async move { Self::run_popular(source, state, Some(&cancel)).await }
        });

        Self {
            source,
            debounce,
            current: Mutex::new(None),
            popular_cancel,
            state,
        }
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.state.subscribe()
    }

    /// 输入变化；返回本次的请求代号
    pub fn set_query(&self, query: &str) -> u64 {
        let keyword = query.trim().to_string();

        // 取消旧请求与递增代号在同一把锁内完成
        let (generation, token) = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = current.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            *current = Some(token.clone());

            let mut generation = 0;
            self.state.send_modify(|s| {
                s.generation += 1;
                generation = s.generation;
                s.query = query.to_string();
                if keyword.is_empty() {
                    s.results.clear();
                    s.search_error = None;
                    s.is_searching = false;
                    s.phase = SearchPhase::Idle;
                } else {
                    s.is_searching = true;
                    s.phase = SearchPhase::Pending;
                }
            });
            (generation, token)
        };

        if !keyword.is_empty() {
            tokio::spawn(Self::run_search(
                Arc::clone(&self.source),
                Arc::clone(&self.state),
                keyword,
                generation,
                token,
                self.debounce,
            ));
        }
        generation
    }

    async fn run_search(
        source: Arc<dyn SearchSource>,
        state: Arc<watch::Sender<SearchSnapshot>>,
        keyword: String,
        generation: u64,
        token: CancellationToken,
        debounce: Duration,
    ) {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(debounce) => {}
        }

        let still_current = state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            s.phase = SearchPhase::InFlight;
            true
        });
        if !still_current {
            return;
        }

        debug!("搜索: {} (代号 {})", keyword, generation);
        let result = source.search(&keyword, Some(&token)).await;
        if matches!(&result, Err(e) if e.is_cancelled()) {
            return;
        }

        state.send_if_modified(move |s| {
            if s.generation != generation {
                debug!("丢弃过期的搜索结果: {} (代号 {})", keyword, generation);
                return false;
            }
            match result {
                Ok(results) => {
                    info!("搜索 {} 返回 {} 条", keyword, results.len());
                    s.results = results;
                    s.search_error = None;
                }
                Err(e) => {
                    error!("搜索失败: {}", e);
                    s.search_error = Some(e.to_string());
                }
            }
            s.is_searching = false;
            s.phase = SearchPhase::Idle;
            true
        });
    }

    /// 重新加载热门搜索
    pub async fn load_popular(&self, cancel: Option<&CancellationToken>) {
        Self::run_popular(Arc::clone(&self.source), Arc::clone(&self.state), cancel).await
    }

    async fn run_popular(
        source: Arc<dyn SearchSource>,
        state: Arc<watch::Sender<SearchSnapshot>>,
        cancel: Option<&CancellationToken>,
    ) {
        state.send_modify(|s| s.is_loading_popular = true);
        let result = source.popular(cancel).await;

        state.send_modify(move |s| {
            match result {
                Ok(popular) => {
                    s.popular = popular;
                    s.popular_error = None;
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    error!("热门搜索加载失败: {}", e);
                    s.popular_error = Some(e.to_string());
                }
            }
            s.is_loading_popular = false;
        });
    }

    pub async fn refresh_popular(&self) {
        self.load_popular(None).await
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.popular_cancel.cancel();
        let current = self.current.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = current.take() {
            token.cancel();
        }
    }
}
