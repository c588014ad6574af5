use std::time::Duration;

use chrono::TimeDelta;

pub const DEFAULT_BASE_URL: &str = "https://dramabox.botraiki.biz/api";

/// API 与编排层的全部可调参数
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub episodes_url: String,
    pub search_url: String,
    pub popular_url: String,

    pub request_timeout: Duration,  // feed / 搜索 / 热门搜索
    pub episodes_timeout: Duration, // 剧集列表响应体可能很大
    pub episodes_cache_ttl: TimeDelta,
    pub episodes_concurrency: usize,

    pub search_debounce: Duration,
    pub max_dramas_in_shorts: usize,
    pub watched_ids_max: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }
}

impl ApiConfig {
    // 所有接口地址都从同一个 base 推导
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            episodes_url: format!("{}/episodes", base),
            search_url: format!("{}/search", base),
            popular_url: format!("{}/populersearch", base),
            base_url: base,
            request_timeout: Duration::from_secs(12),
            episodes_timeout: Duration::from_secs(90),
            episodes_cache_ttl: TimeDelta::hours(2),
            episodes_concurrency: 10,
            search_debounce: Duration::from_millis(350),
            max_dramas_in_shorts: 18,
            watched_ids_max: 500,
        }
    }

    pub fn feed_url(&self, segment: &str) -> String {
        format!("{}/{}", self.base_url, segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_derive_from_base() {
        let config = ApiConfig::with_base_url("http://localhost:1234/api/");
        assert_eq!(config.base_url, "http://localhost:1234/api");
        assert_eq!(config.episodes_url, "http://localhost:1234/api/episodes");
        assert_eq!(config.feed_url("for-you"), "http://localhost:1234/api/for-you");
    }

    #[test]
    fn test_default_constants() {
        let config = ApiConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(12));
        assert_eq!(config.episodes_timeout, Duration::from_secs(90));
        assert_eq!(config.episodes_cache_ttl, TimeDelta::hours(2));
        assert_eq!(config.episodes_concurrency, 10);
        assert_eq!(config.search_debounce, Duration::from_millis(350));
    }
}
