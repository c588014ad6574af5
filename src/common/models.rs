use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DramaFeedCategory {
    #[default]
    Latest,
    Trending,
    ForYou,
    Vip,
    Random,
    Dubbed,
}

impl DramaFeedCategory {
    pub const ALL: [DramaFeedCategory; 6] = [
        DramaFeedCategory::Latest,
        DramaFeedCategory::Trending,
        DramaFeedCategory::ForYou,
        DramaFeedCategory::Vip,
        DramaFeedCategory::Random,
        DramaFeedCategory::Dubbed,
    ];

    // 对应 API 路径段
    pub fn as_segment(&self) -> &'static str {
        match self {
            DramaFeedCategory::Latest => "latest",
            DramaFeedCategory::Trending => "trending",
            DramaFeedCategory::ForYou => "for-you",
            DramaFeedCategory::Vip => "vip",
            DramaFeedCategory::Random => "random",
            DramaFeedCategory::Dubbed => "dubbed",
        }
    }
}

impl fmt::Display for DramaFeedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_segment())
    }
}

impl FromStr for DramaFeedCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_segment() == s.trim())
            .ok_or_else(|| format!("未知分类: {}", s))
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagV3 {
    pub tag_id: f64,
    pub tag_name: String,
    pub tag_en_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankVo {
    pub rank_type: f64,
    pub hot_code: String,
    pub sort: f64,
}

/// 一部短剧的元数据，与具体剧集无关
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DramaItem {
    pub book_id: String,
    pub book_name: String,
    pub cover_wap: String,
    pub chapter_count: f64,
    pub introduction: String,
    pub tags: Vec<String>,
    pub tag_v3s: Vec<TagV3>,
    pub protagonist: String,
    pub rank_vo: Option<RankVo>,
    pub shelf_time: String,
    pub in_library: bool,
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeVideoPath {
    pub quality: f64,
    pub video_path: String,
    pub is_default: f64,
    pub is_vip_equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeCdn {
    pub cdn_domain: String,
    pub is_default: f64,
    pub video_path_list: Vec<EpisodeVideoPath>,
}

/// 单集，通过 bookId 归属到某部短剧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DramaEpisode {
    pub chapter_id: String,
    pub chapter_index: f64,
    pub is_charge: f64,
    pub chapter_name: String,
    pub cdn_list: Vec<EpisodeCdn>,
    pub cover: String,
    pub duration: f64,
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DramaSearchItem {
    pub book_id: String,
    pub book_name: String,
    pub introduction: String,
    pub cover: String,
    pub protagonist: String,
    pub tag_names: Vec<String>,
    pub in_library: bool,
}

// -----------------------------------------------------------------------------------------------

/// 首页竖屏短视频流中的一项：短剧 + 选中的剧集 + 播放地址
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortFeedItem {
    pub id: String,
    pub book_id: String,
    pub drama_title: String,
    pub drama: DramaItem,
    pub episode: DramaEpisode,
    pub stream_url: String,
}

impl ShortFeedItem {
    pub fn new(drama: DramaItem, episode: DramaEpisode, stream_url: String) -> Self {
        // chapterId 为空时退回到序号
        let suffix = if episode.chapter_id.is_empty() {
            episode.chapter_index.to_string()
        } else {
            episode.chapter_id.clone()
        };
        Self {
            id: format!("{}-{}", drama.book_id, suffix),
            book_id: drama.book_id.clone(),
            drama_title: drama.book_name.clone(),
            drama,
            episode,
            stream_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortFeedCachePayload {
    pub saved_at: i64,
    pub items: Vec<ShortFeedItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_segments_round_trip() {
        for category in DramaFeedCategory::ALL {
            assert_eq!(
                category.as_segment().parse::<DramaFeedCategory>().unwrap(),
                category
            );
        }
        assert!("horror".parse::<DramaFeedCategory>().is_err());
    }
}
