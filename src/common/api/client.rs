use std::sync::Arc;

use reqwest::{
    Client, ClientBuilder, Response,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

use super::error::ApiError;
use super::timeout::with_timeout;
use crate::common::config::ApiConfig;
use crate::common::models::{DramaEpisode, DramaFeedCategory, DramaItem, DramaSearchItem};
use crate::parser::normalize::{
    normalize_drama_list, normalize_episode_list, normalize_search_list,
};

// 短剧内容 API 客户端，所有请求都带超时和可选的取消信号
#[derive(Debug, Clone)]
pub struct DramaClient {
    pub inner: Client,
    config: Arc<ApiConfig>,
}

impl DramaClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let inner = ClientBuilder::new()
            .default_headers(Self::get_default_headers())
            .build()
            .map_err(|e| {
                error!("创建 HTTP 客户端失败: {}", e);
                ApiError::Http(e)
            })?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("dramafeed/", env!("CARGO_PKG_VERSION"))),
        );
        headers
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    // 通用 GET，返回原始 JSON
    async fn get_json(&self, url: Url, context: &str) -> Result<Value, ApiError> {
        debug!("GET {}", url);
        let resp = self.inner.get(url).send().await.map_err(|e| {
            error!("请求失败: {}", e);
            ApiError::Http(e)
        })?;

        Self::handle_response(resp, context).await
    }

    async fn handle_response(resp: Response, context: &str) -> Result<Value, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                context: context.to_string(),
            });
        }

        let raw_body = resp.bytes().await?;
        serde_json::from_slice::<Value>(&raw_body).map_err(|e| {
            error!("{} 响应不是合法 JSON: {}", context, e);
            ApiError::InvalidShape(format!("{} 响应不是合法 JSON: {}", context, e))
        })
    }

    // 解析接口地址并追加查询参数，参数值会被正确转义
    fn endpoint(raw: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url =
            Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    // ---------------------------------------------------------------------------------------

    pub async fn fetch_drama_feed(
        &self,
        category: DramaFeedCategory,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<DramaItem>, ApiError> {
        let url = Self::endpoint(&self.config.feed_url(category.as_segment()), &[])?;
        let context = format!("分类 {}", category);

        let payload = with_timeout(
            self.get_json(url, &context),
            self.config.request_timeout,
            cancel,
        )
        .await?;

        let dramas = normalize_drama_list(&payload)?;
        info!("分类 {} 加载完成: {} 部短剧", category, dramas.len());
        Ok(dramas)
    }

    pub async fn fetch_latest_dramas(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<DramaItem>, ApiError> {
        self.fetch_drama_feed(DramaFeedCategory::Latest, cancel).await
    }

    /// 直接请求剧集接口，不经过缓存和并发限制；调用方应使用 `EpisodeService`
    pub async fn fetch_episodes_uncached(
        &self,
        book_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<DramaEpisode>, ApiError> {
        let url = Self::endpoint(&self.config.episodes_url, &[("bookId", book_id)])?;

        let payload = with_timeout(
            self.get_json(url, "剧集"),
            self.config.episodes_timeout,
            cancel,
        )
        .await?;

        normalize_episode_list(&payload)
    }

    pub async fn fetch_drama_search(
        &self,
        keyword: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<DramaSearchItem>, ApiError> {
        let url = Self::endpoint(&self.config.search_url, &[("query", keyword)])?;

        let payload = with_timeout(
            self.get_json(url, "搜索"),
            self.config.request_timeout,
            cancel,
        )
        .await?;

        normalize_search_list(&payload)
    }

    pub async fn fetch_popular_searches(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<DramaItem>, ApiError> {
        let url = Self::endpoint(&self.config.popular_url, &[])?;

        let payload = with_timeout(
            self.get_json(url, "热门搜索"),
            self.config.request_timeout,
            cancel,
        )
        .await?;

        normalize_drama_list(&payload)
    }
}
