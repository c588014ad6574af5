use colored::*;

use crate::common::models::{DramaEpisode, DramaItem, DramaSearchItem, ShortFeedItem};
use crate::parser::utils::FormatTool;

/// 命令行输出工具
pub struct PrettyLogger;

impl PrettyLogger {
    /// 显示成功消息
    pub fn success(message: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), message.as_ref());
    }

    /// 显示信息消息
    pub fn info(message: impl AsRef<str>) {
        println!("{} {}", "ℹ".blue().bold(), message.as_ref());
    }

    /// 显示警告消息
    pub fn warning(message: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow().bold(), message.as_ref());
    }

    /// 显示错误消息
    pub fn error(message: impl AsRef<str>) {
        println!("{} {}", "✗".red().bold(), message.as_ref());
    }

    /// 显示步骤开始
    pub fn step_start(step: impl AsRef<str>) {
        println!("\n{} {}", "▶".cyan().bold(), step.as_ref().bold());
    }

    /// 短剧一行
    pub fn drama(index: usize, drama: &DramaItem) {
        println!(
            "{:>3}. {} {} ({} 集, {})",
            index + 1,
            "🎬".magenta(),
            drama.book_name.bold(),
            drama.chapter_count,
            FormatTool::format_shelf_time(&drama.shelf_time).bright_black()
        );
    }

    pub fn episode(episode: &DramaEpisode, stream: Option<&str>) {
        let vip = if FormatTool::is_episode_vip(episode) {
            " VIP".yellow().bold().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} [{}]{} {}",
            FormatTool::episode_label(episode).bold(),
            FormatTool::format_duration(episode.duration),
            vip,
            stream.unwrap_or("-").cyan()
        );
    }

    pub fn short_item(index: usize, item: &ShortFeedItem) {
        println!(
            "{:>3}. {} {} · {}",
            index + 1,
            "▶".green(),
            item.drama_title.bold(),
            FormatTool::episode_label(&item.episode)
        );
        println!("     {}", item.stream_url.cyan());
    }

    pub fn search_result(index: usize, item: &DramaSearchItem) {
        println!(
            "{:>3}. {} {} ({})",
            index + 1,
            "🔍".blue(),
            item.book_name.bold(),
            item.protagonist.bright_black()
        );
    }
}

/// 便捷宏
#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::success(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::info(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::warning(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::error(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_step {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::step_start(format!($($arg)*))
    };
}
