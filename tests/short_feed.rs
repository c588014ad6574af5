use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use drama_feed::common::api::error::ApiError;
use drama_feed::common::models::ShortFeedCachePayload;
use drama_feed::feed::short_feed::{
    BuildOptions, ShortFeed, WATCHED_SHORTS_IDS_KEY, assemble_short_items, shorts_cache_key,
};
use drama_feed::feed::storage::{KeyValueStore, MemoryStore, get_json, set_json};
use drama_feed::parser::normalize::{normalize_drama, normalize_episode};
use drama_feed::{
    ApiConfig, DramaEpisode, DramaFeedCategory, DramaItem, EpisodeSource, FetchOptions,
};
use serde_json::json;

#[derive(Clone)]
enum Reply {
    Episodes(Vec<DramaEpisode>),
    Fail,
}

/// 按 bookId 返回预设结果的剧集来源
#[derive(Default)]
struct FakeEpisodes {
    replies: HashMap<String, Reply>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl FakeEpisodes {
    fn with(mut self, book_id: &str, reply: Reply) -> Self {
        self.replies.insert(book_id.to_string(), reply);
        self
    }

    fn delayed(mut self, book_id: &str, delay: Duration) -> Self {
        self.delays.insert(book_id.to_string(), delay);
        self
    }

    fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EpisodeSource for FakeEpisodes {
    async fn fetch_drama_episodes(
        &self,
        book_id: &str,
        options: FetchOptions,
    ) -> Result<Vec<DramaEpisode>, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((book_id.to_string(), options.force_refresh));
        if let Some(delay) = self.delays.get(book_id) {
            tokio::time::sleep(*delay).await;
        }
        match self.replies.get(book_id) {
            Some(Reply::Episodes(eps)) => Ok(eps.clone()),
            Some(Reply::Fail) | None => Err(ApiError::Timeout(Duration::from_secs(90))),
        }
    }
}

fn drama(book_id: &str) -> DramaItem {
    normalize_drama(&json!({"bookId": book_id, "bookName": format!("Drama {}", book_id)})).unwrap()
}

fn playable(chapter_id: &str, index: u32, url: &str) -> DramaEpisode {
    normalize_episode(&json!({
        "chapterId": chapter_id,
        "chapterIndex": index,
        "cdnList": [{"cdnDomain": "a.cdn", "isDefault": 1, "videoPathList": [
            {"quality": 720, "videoPath": url, "isDefault": 0, "isVipEquity": 0}
        ]}]
    }))
    .unwrap()
}

fn unplayable(chapter_id: &str, index: u32) -> DramaEpisode {
    normalize_episode(&json!({"chapterId": chapter_id, "chapterIndex": index})).unwrap()
}

fn feed_with(
    source: Arc<FakeEpisodes>,
    store: Arc<MemoryStore>,
    config: &ApiConfig,
) -> ShortFeed {
    ShortFeed::new(DramaFeedCategory::Latest, source, store, config)
}

// -----------------------------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_entry_is_dropped_from_batch() {
    let source = FakeEpisodes::default()
        .with("b1", Reply::Episodes(vec![playable("c1", 0, "u1")]))
        .with("b2", Reply::Fail)
        .with("b3", Reply::Episodes(vec![playable("c1", 0, "u3")]));
    let dramas = vec![drama("b1"), drama("b2"), drama("b3")];

    let items = assemble_short_items(&source, &dramas, 18, false).await;

    let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["b1-c1", "b3-c1"]);
    assert_eq!(items[1].stream_url, "u3");
    assert_eq!(items[1].drama_title, "Drama b3");
}

#[tokio::test]
async fn test_first_playable_episode_is_chosen() {
    let source = FakeEpisodes::default().with(
        "b1",
        Reply::Episodes(vec![
            unplayable("c0", 0),
            playable("", 1, "u1"),
            playable("c2", 2, "u2"),
        ]),
    );

    let items = assemble_short_items(&source, &[drama("b1")], 18, false).await;
    assert_eq!(items.len(), 1);
    // chapterId 为空时 id 使用序号
    assert_eq!(items[0].id, "b1-1");
    assert_eq!(items[0].stream_url, "u1");
}

#[tokio::test(start_paused = true)]
async fn test_episode_fetches_run_concurrently() {
    let source = FakeEpisodes::default()
        .with("b1", Reply::Episodes(vec![playable("c1", 0, "u1")]))
        .with("b2", Reply::Episodes(vec![playable("c1", 0, "u2")]))
        .with("b3", Reply::Episodes(vec![playable("c1", 0, "u3")]))
        .delayed("b1", Duration::from_secs(5))
        .delayed("b2", Duration::from_secs(5))
        .delayed("b3", Duration::from_secs(5));
    let dramas = vec![drama("b1"), drama("b2"), drama("b3")];

    let started = tokio::time::Instant::now();
    let items = assemble_short_items(&source, &dramas, 18, false).await;
    let elapsed = started.elapsed();

    assert_eq!(items.len(), 3);
    assert!(
        elapsed < Duration::from_secs(6),
        "三个请求应并发完成，实际耗时 {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_only_first_candidates_are_fetched() {
    let source = FakeEpisodes::default();
    let dramas: Vec<_> = (0..25).map(|i| drama(&format!("b{}", i))).collect();

    assemble_short_items(&source, &dramas, 18, true).await;

    let calls = source.calls();
    assert_eq!(calls.len(), 18);
    assert!(calls.iter().all(|(_, forced)| *forced));
}

// -----------------------------------------------------------------------------------------------

#[tokio::test]
async fn test_build_persists_and_rehydrates() {
    let config = ApiConfig::default();
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(
        FakeEpisodes::default().with("b1", Reply::Episodes(vec![playable("c1", 0, "u1")])),
    );

    let feed = feed_with(source.clone(), store.clone(), &config);
    feed.hydrate().await;
    let snapshot = feed.build(&[drama("b1")], true, BuildOptions::default()).await;

    assert_eq!(snapshot.items.len(), 1);
    assert!(!snapshot.is_using_offline_cache);
    assert!(!snapshot.is_loading);
    assert!(snapshot.error.is_none());

    let payload: ShortFeedCachePayload =
        get_json(store.as_ref(), &shorts_cache_key(DramaFeedCategory::Latest))
            .await
            .unwrap();
    assert_eq!(payload.items, snapshot.items);
    assert!(payload.saved_at > 0);

    // 新实例从存储恢复后立即展示
    let again = feed_with(source, store, &config);
    let hydrated = again.hydrate().await;
    assert_eq!(hydrated.items, snapshot.items);
    assert!(!hydrated.is_loading);
}

#[tokio::test]
async fn test_no_playable_falls_back_to_cache() {
    let config = ApiConfig::default();
    let store = Arc::new(MemoryStore::new());
    let cached = assemble_short_items(
        &FakeEpisodes::default().with("old", Reply::Episodes(vec![playable("c1", 0, "u0")])),
        &[drama("old")],
        18,
        false,
    )
    .await;
    set_json(
        store.as_ref(),
        &shorts_cache_key(DramaFeedCategory::Latest),
        &ShortFeedCachePayload {
            saved_at: 1,
            items: cached.clone(),
        },
    )
    .await
    .unwrap();

    let source = Arc::new(FakeEpisodes::default().with("b1", Reply::Fail));
    let feed = feed_with(source, store, &config);
    feed.hydrate().await;
    let snapshot = feed.build(&[drama("b1")], true, BuildOptions::default()).await;

    assert_eq!(snapshot.items, cached);
    assert!(snapshot.is_using_offline_cache);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_no_playable_without_cache_is_error() {
    let config = ApiConfig::default();
    let source = Arc::new(FakeEpisodes::default().with("b1", Reply::Episodes(vec![unplayable("c1", 0)])));
    let feed = feed_with(source, Arc::new(MemoryStore::new()), &config);
    feed.hydrate().await;

    let snapshot = feed.build(&[drama("b1")], true, BuildOptions::default()).await;
    assert!(snapshot.items.is_empty());
    assert_eq!(
        snapshot.error.as_deref(),
        Some(ApiError::NoPlayableShorts.to_string().as_str())
    );
}

#[tokio::test]
async fn test_offline_uses_watched_items_then_all() {
    let config = ApiConfig::default();
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(
        FakeEpisodes::default()
            .with("b1", Reply::Episodes(vec![playable("c1", 0, "u1")]))
            .with("b2", Reply::Episodes(vec![playable("c1", 0, "u2")])),
    );

    let feed = feed_with(source.clone(), store.clone(), &config);
    feed.hydrate().await;
    feed.build(&[drama("b1"), drama("b2")], true, BuildOptions::default())
        .await;

    // 没有观看记录：全部缓存
    let offline = feed.build(&[], false, BuildOptions::default()).await;
    assert_eq!(offline.items.len(), 2);
    assert!(offline.is_using_offline_cache);

    // 有匹配的观看记录：只展示看过的
    feed.mark_as_watched("b2-c1").await.unwrap();
    let offline = feed.build(&[], false, BuildOptions::default()).await;
    let ids: Vec<_> = offline.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["b2-c1"]);

    // 观看记录与缓存完全不相交：退回全部缓存
    let other = feed_with(source, store.clone(), &config);
    store
        .set_item(WATCHED_SHORTS_IDS_KEY, r#"["zzz-1"]"#.to_string())
        .await
        .unwrap();
    other.hydrate().await;
    let offline = other.build(&[], false, BuildOptions::default()).await;
    assert_eq!(offline.items.len(), 2);
}

#[tokio::test]
async fn test_offline_without_cache_is_error() {
    let config = ApiConfig::default();
    let feed = feed_with(
        Arc::new(FakeEpisodes::default()),
        Arc::new(MemoryStore::new()),
        &config,
    );
    feed.hydrate().await;

    let snapshot = feed.build(&[drama("b1")], false, BuildOptions::default()).await;
    assert!(snapshot.items.is_empty());
    assert!(snapshot.error.is_some());
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn test_empty_candidates_without_cache_is_empty_not_error() {
    let config = ApiConfig::default();
    let feed = feed_with(
        Arc::new(FakeEpisodes::default()),
        Arc::new(MemoryStore::new()),
        &config,
    );
    feed.hydrate().await;

    let snapshot = feed.build(&[], true, BuildOptions::default()).await;
    assert!(snapshot.items.is_empty());
    assert!(snapshot.error.is_none());
    assert!(!snapshot.is_using_offline_cache);
}

#[tokio::test]
async fn test_build_before_hydrate_does_nothing() {
    let config = ApiConfig::default();
    let source = Arc::new(FakeEpisodes::default());
    let feed = feed_with(source.clone(), Arc::new(MemoryStore::new()), &config);

    let snapshot = feed.build(&[drama("b1")], true, BuildOptions::default()).await;
    assert!(!snapshot.is_hydrated);
    assert!(source.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_build_is_discarded() {
    let config = ApiConfig::default();
    let source = Arc::new(
        FakeEpisodes::default()
            .with("slow", Reply::Episodes(vec![playable("c1", 0, "u-slow")]))
            .with("fast", Reply::Episodes(vec![playable("c1", 0, "u-fast")]))
            .delayed("slow", Duration::from_secs(5)),
    );
    let feed = feed_with(source, Arc::new(MemoryStore::new()), &config);
    feed.hydrate().await;

    let slow = [drama("slow")];
    let fast = [drama("fast")];
    let (_, latest) = tokio::join!(
        feed.build(&slow, true, BuildOptions::default()),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            feed.refresh(&fast, true).await
        }
    );

    assert_eq!(latest.items[0].stream_url, "u-fast");
    let final_state = feed.snapshot();
    assert_eq!(final_state.items.len(), 1);
    assert_eq!(final_state.items[0].stream_url, "u-fast");
    assert!(!final_state.is_refreshing);
}

#[tokio::test]
async fn test_watched_ids_are_capped() {
    let mut config = ApiConfig::default();
    config.watched_ids_max = 3;
    let store = Arc::new(MemoryStore::new());
    let feed = feed_with(Arc::new(FakeEpisodes::default()), store.clone(), &config);
    feed.hydrate().await;

    for id in ["a", "b", " ", "b", "c", "d"] {
        feed.mark_as_watched(id).await.unwrap();
    }

    assert_eq!(feed.watched_ids(), vec!["b", "c", "d"]);
    let persisted: Vec<String> = get_json(store.as_ref(), WATCHED_SHORTS_IDS_KEY).await.unwrap();
    assert_eq!(persisted, vec!["b", "c", "d"]);
}
