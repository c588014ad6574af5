use itertools::Itertools;
use tracing::debug;

use crate::common::models::DramaEpisode;

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeStream {
    pub quality: f64,
    pub video_path: String,
    pub is_default: bool,
    pub is_vip_equity: bool,
}

/// 汇总一集所有 CDN 的候选流，去重后按（默认标记，清晰度）降序排列
///
/// CDN 级别的默认标记会传递给其下的所有流。按 URL 去重时保留第一次出现的那条。
pub fn get_episode_streams(episode: &DramaEpisode) -> Vec<EpisodeStream> {
    let mut streams: Vec<EpisodeStream> = episode
        .cdn_list
        .iter()
        .flat_map(|cdn| {
            cdn.video_path_list
                .iter()
                .filter(|path| !path.video_path.is_empty())
                .map(move |path| EpisodeStream {
                    quality: path.quality,
                    video_path: path.video_path.clone(),
                    is_default: path.is_default == 1.0 || cdn.is_default == 1.0,
                    is_vip_equity: path.is_vip_equity == 1.0,
                })
        })
        .unique_by(|stream| stream.video_path.clone())
        .collect();

    // sort_by 是稳定排序，结果对同一输入是确定的
    streams.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| b.quality.total_cmp(&a.quality))
    });

    streams
}

/// 选择默认播放地址
pub fn get_preferred_stream_url(episode: &DramaEpisode) -> Option<String> {
    let preferred = get_episode_streams(episode).into_iter().next()?;
    debug!(
        "第 {} 集选中流: 清晰度={}, 默认={}",
        episode.chapter_index, preferred.quality, preferred.is_default
    );
    Some(preferred.video_path)
}
