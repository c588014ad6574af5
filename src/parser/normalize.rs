//! 把结构松散的 JSON 转成严格的记录
//!
//! 每个字段独立取默认值：字符串默认为空或占位文字，数字默认为 0，
//! 数组默认为空。单个字段异常不会丢掉整条记录；不是对象的元素直接过滤。

use serde_json::{Map, Value};

use crate::common::api::error::ApiError;
use crate::common::models::{
    DramaEpisode, DramaItem, DramaSearchItem, EpisodeCdn, EpisodeVideoPath, RankVo,
    ShortFeedItem, TagV3,
};

pub const UNTITLED: &str = "Tanpa Judul";
pub const NO_SYNOPSIS: &str = "Belum ada sinopsis.";
pub const UNKNOWN_PROTAGONIST: &str = "Tidak diketahui";

type Raw = Map<String, Value>;

fn string_or(raw: &Raw, key: &str, fallback: &str) -> String {
    match raw.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => fallback.to_string(),
    }
}

fn string_field(raw: &Raw, key: &str) -> String {
    string_or(raw, key, "")
}

// serde_json 的数字一定是有限值
fn number_field(raw: &Raw, key: &str) -> f64 {
    raw.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// 与 JS 的 `Boolean(x)` 一致的真值判断
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

// 只有全部元素都是字符串时才保留
fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

fn object_list<T>(value: Option<&Value>, f: impl Fn(&Raw) -> T) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).map(f).collect(),
        _ => Vec::new(),
    }
}

fn parse_tag_v3s(value: Option<&Value>) -> Vec<TagV3> {
    object_list(value, |raw| TagV3 {
        tag_id: number_field(raw, "tagId"),
        tag_name: string_field(raw, "tagName"),
        tag_en_name: string_field(raw, "tagEnName"),
    })
}

fn parse_video_path_list(value: Option<&Value>) -> Vec<EpisodeVideoPath> {
    object_list(value, |raw| EpisodeVideoPath {
        quality: number_field(raw, "quality"),
        video_path: string_field(raw, "videoPath"),
        is_default: number_field(raw, "isDefault"),
        is_vip_equity: number_field(raw, "isVipEquity"),
    })
    .into_iter()
    .filter(|path| !path.video_path.is_empty())
    .collect()
}

fn parse_cdn_list(value: Option<&Value>) -> Vec<EpisodeCdn> {
    object_list(value, |raw| EpisodeCdn {
        cdn_domain: string_field(raw, "cdnDomain"),
        is_default: number_field(raw, "isDefault"),
        video_path_list: parse_video_path_list(raw.get("videoPathList")),
    })
}

fn parse_rank_vo(value: Option<&Value>) -> Option<RankVo> {
    let raw = value?.as_object()?;
    Some(RankVo {
        rank_type: number_field(raw, "rankType"),
        hot_code: string_field(raw, "hotCode"),
        sort: number_field(raw, "sort"),
    })
}

pub fn normalize_drama(value: &Value) -> Option<DramaItem> {
    let raw = value.as_object()?;

    Some(DramaItem {
        book_id: string_field(raw, "bookId"),
        book_name: string_or(raw, "bookName", UNTITLED),
        cover_wap: string_field(raw, "coverWap"),
        chapter_count: number_field(raw, "chapterCount"),
        introduction: string_or(raw, "introduction", NO_SYNOPSIS),
        tags: string_list(raw.get("tags")),
        tag_v3s: parse_tag_v3s(raw.get("tagV3s")),
        protagonist: string_or(raw, "protagonist", UNKNOWN_PROTAGONIST),
        rank_vo: parse_rank_vo(raw.get("rankVo")),
        shelf_time: string_field(raw, "shelfTime"),
        in_library: is_truthy(raw.get("inLibrary")),
    })
}

pub fn normalize_episode(value: &Value) -> Option<DramaEpisode> {
    let raw = value.as_object()?;

    Some(DramaEpisode {
        chapter_id: string_field(raw, "chapterId"),
        chapter_index: number_field(raw, "chapterIndex"),
        is_charge: number_field(raw, "isCharge"),
        chapter_name: string_field(raw, "chapterName"),
        cdn_list: parse_cdn_list(raw.get("cdnList")),
        cover: string_field(raw, "cover"),
        duration: number_field(raw, "duration"),
    })
}

pub fn normalize_search_item(value: &Value) -> Option<DramaSearchItem> {
    let raw = value.as_object()?;

    // 搜索接口有时只返回 coverWap
    let cover = match raw.get("cover") {
        Some(Value::String(s)) => s.clone(),
        _ => string_field(raw, "coverWap"),
    };

    Some(DramaSearchItem {
        book_id: string_field(raw, "bookId"),
        book_name: string_or(raw, "bookName", UNTITLED),
        introduction: string_or(raw, "introduction", NO_SYNOPSIS),
        cover,
        protagonist: string_or(raw, "protagonist", UNKNOWN_PROTAGONIST),
        tag_names: string_list(raw.get("tagNames")),
        in_library: is_truthy(raw.get("inLibrary")),
    })
}

fn expect_array<'a>(payload: &'a Value, context: &str) -> Result<&'a Vec<Value>, ApiError> {
    payload
        .as_array()
        .ok_or_else(|| ApiError::InvalidShape(format!("{} 响应不是数组", context)))
}

pub fn normalize_drama_list(payload: &Value) -> Result<Vec<DramaItem>, ApiError> {
    Ok(expect_array(payload, "feed")?
        .iter()
        .filter_map(normalize_drama)
        .collect())
}

/// 剧集按 chapterIndex 升序（稳定排序）
pub fn normalize_episode_list(payload: &Value) -> Result<Vec<DramaEpisode>, ApiError> {
    let mut episodes: Vec<DramaEpisode> = expect_array(payload, "episodes")?
        .iter()
        .filter_map(normalize_episode)
        .collect();
    episodes.sort_by(|a, b| a.chapter_index.total_cmp(&b.chapter_index));
    Ok(episodes)
}

pub fn normalize_search_list(payload: &Value) -> Result<Vec<DramaSearchItem>, ApiError> {
    Ok(expect_array(payload, "search")?
        .iter()
        .filter_map(normalize_search_item)
        .collect())
}

/// 本地持久化的短视频流条目，结构不完整的直接丢弃
pub fn normalize_cached_short_items(value: Option<&Value>) -> Vec<ShortFeedItem> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let raw = item.as_object()?;
            let id = raw.get("id")?.as_str()?;
            let book_id = raw.get("bookId")?.as_str()?;
            let drama_title = raw.get("dramaTitle")?.as_str()?;
            let stream_url = raw.get("streamUrl")?.as_str()?;
            if !is_truthy(raw.get("drama")) || !is_truthy(raw.get("episode")) {
                return None;
            }
            Some(ShortFeedItem {
                id: id.to_string(),
                book_id: book_id.to_string(),
                drama_title: drama_title.to_string(),
                drama: normalize_drama(raw.get("drama")?)?,
                episode: normalize_episode(raw.get("episode")?)?,
                stream_url: stream_url.to_string(),
            })
        })
        .collect()
}
