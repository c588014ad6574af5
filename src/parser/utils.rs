use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike};

use crate::common::models::DramaEpisode;

const MONTHS_ID: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

pub struct FormatTool;

impl FormatTool {
    // 格式化时长 m:ss
    pub fn format_duration(seconds: f64) -> String {
        if !seconds.is_finite() || seconds <= 0.0 {
            return "-".to_string();
        }
        let total = seconds.floor() as u64;
        format!("{}:{:02}", total / 60, total % 60)
    }

    pub fn episode_label(episode: &DramaEpisode) -> String {
        if episode.chapter_name.is_empty() {
            format!("EP {}", episode.chapter_index + 1.0)
        } else {
            episode.chapter_name.clone()
        }
    }

    pub fn is_episode_vip(episode: &DramaEpisode) -> bool {
        episode.is_charge == 1.0
    }

    // 上架时间 "2024-01-05 10:00:00"，也兼容 T 分隔和纯日期
    pub fn parse_shelf_time(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let normalized = raw.replacen(' ', "T", 1);

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
            return Some(dt.naive_utc());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M") {
            return Some(dt);
        }
        NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// 例如 "5 Jan 2024"；解析失败时原样返回，空字符串返回 "-"
    pub fn format_shelf_time(raw: &str) -> String {
        match Self::parse_shelf_time(raw) {
            Some(dt) => format!(
                "{} {} {}",
                dt.day(),
                MONTHS_ID[dt.month0() as usize],
                dt.year()
            ),
            None if raw.is_empty() => "-".to_string(),
            None => raw.to_string(),
        }
    }

    /// 例如 "05 Jan 14.30"
    pub fn format_updated_at<Tz: TimeZone>(value: Option<&DateTime<Tz>>) -> String {
        match value {
            Some(dt) => format!(
                "{:02} {} {:02}.{:02}",
                dt.day(),
                MONTHS_ID[dt.month0() as usize],
                dt.hour(),
                dt.minute()
            ),
            None => "-".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize::normalize_episode;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_format_duration() {
        assert_eq!(FormatTool::format_duration(0.0), "-");
        assert_eq!(FormatTool::format_duration(-3.0), "-");
        assert_eq!(FormatTool::format_duration(f64::NAN), "-");
        assert_eq!(FormatTool::format_duration(65.9), "1:05");
        assert_eq!(FormatTool::format_duration(600.0), "10:00");
    }

    #[test]
    fn test_episode_label_and_vip() {
        let named = normalize_episode(&json!({"chapterName": "Pilot", "isCharge": 1})).unwrap();
        let unnamed = normalize_episode(&json!({"chapterIndex": 4})).unwrap();
        assert_eq!(FormatTool::episode_label(&named), "Pilot");
        assert_eq!(FormatTool::episode_label(&unnamed), "EP 5");
        assert!(FormatTool::is_episode_vip(&named));
        assert!(!FormatTool::is_episode_vip(&unnamed));
    }

    #[test]
    fn test_format_shelf_time() {
        assert_eq!(FormatTool::format_shelf_time("2024-10-05 08:30:00"), "5 Okt 2024");
        assert_eq!(FormatTool::format_shelf_time("2024-08-17"), "17 Agu 2024");
        assert_eq!(FormatTool::format_shelf_time("kemarin"), "kemarin");
        assert_eq!(FormatTool::format_shelf_time(""), "-");
    }

    #[test]
    fn test_format_updated_at() {
        let dt = Utc.with_ymd_and_hms(2026, 5, 3, 9, 7, 0).unwrap();
        assert_eq!(FormatTool::format_updated_at(Some(&dt)), "03 Mei 09.07");
        assert_eq!(FormatTool::format_updated_at::<Utc>(None), "-");
    }
}
