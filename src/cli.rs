use clap::{Parser, Subcommand};
use std::path::PathBuf;

use drama_feed::DramaFeedCategory;
use drama_feed::common::config::DEFAULT_BASE_URL;

/// 短剧浏览工具
#[derive(Parser, Debug)]
#[command(name = "dramafeed")]
#[command(version = "0.1")]
#[command(about = "浏览短剧分类、剧集、首页短视频流和搜索", long_about = None)]
pub struct Cli {
    /// API 根地址
    #[arg(long, global = true, value_name = "URL")]
    #[arg(env = "DRAMAFEED_BASE_URL", default_value = DEFAULT_BASE_URL)]
    #[arg(value_hint = clap::ValueHint::Url)]
    pub base_url: String,

    /// 输出调试日志
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 分类短剧列表
    Feed {
        #[arg(long, default_value = "latest")]
        #[arg(help = "分类: latest, trending, for-you, vip, random, dubbed")]
        category: DramaFeedCategory,
    },

    /// 某部短剧的全部剧集
    Episodes {
        #[arg(long, value_name = "BOOK_ID")]
        book_id: String,

        /// 跳过剧集缓存
        #[arg(long)]
        force_refresh: bool,
    },

    /// 首页竖屏短视频流
    Shorts {
        #[arg(long, default_value = "latest")]
        category: DramaFeedCategory,

        /// 模拟离线，只使用本地缓存
        #[arg(long)]
        offline: bool,

        /// 强制刷新（跳过剧集缓存）
        #[arg(long)]
        refresh: bool,

        /// 标记为已观看的条目 id，可重复
        #[arg(long = "watched", value_name = "ITEM_ID")]
        watched: Vec<String>,

        /// 本地缓存目录
        #[arg(long, value_name = "DIR", default_value = "./.dramafeed")]
        #[arg(value_hint = clap::ValueHint::DirPath)]
        store_dir: PathBuf,
    },

    /// 搜索短剧（逐字输入，经过防抖）
    Search {
        #[arg(long)]
        query: String,
    },

    /// 热门搜索
    Popular,
}
