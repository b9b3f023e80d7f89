use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 观看百分比达到该阈值后记录视为已完成
pub const COMPLETION_THRESHOLD: f64 = 90.0;

/// 最近一次上报的设备信息。提供的字段覆盖旧值，缺失的字段保持不变。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub browser: Option<String>,
}

impl DeviceInfo {
    pub fn merge_from(&mut self, other: &DeviceInfo) {
        if other.user_agent.is_some() {
            self.user_agent = other.user_agent.clone();
        }
        if other.platform.is_some() {
            self.platform = other.platform.clone();
        }
        if other.browser.is_some() {
            self.browser = other.browser.clone();
        }
    }
}

/// 每个 (user, video) 对至多一条的观看进度记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchProgress {
    pub id: String,
    pub user_id: String,
    pub video_id: String,
    /// 已观看秒数，只增不减
    pub watch_progress: f64,
    pub watch_percentage: f64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub watch_sessions: i64,
    pub last_watched_at: DateTime<Utc>,
    pub device_info: DeviceInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchProgress {
    pub fn new(id: String, user_id: String, video_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            video_id,
            watch_progress: 0.0,
            watch_percentage: 0.0,
            is_completed: false,
            completed_at: None,
            watch_sessions: 0,
            last_watched_at: now,
            device_info: DeviceInfo::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 应用一次进度上报。
    ///
    /// 进度取历史最大值，乱序或重复的客户端上报不会让它回退。
    /// 百分比和完成状态只在拿到正时长时重算；完成标记是单向的，
    /// 置位后后续上报不会清除。每次调用会话计数 +1。
    pub fn apply_report(
        &mut self,
        reported_progress: f64,
        video_duration: Option<f64>,
        device_info: Option<&DeviceInfo>,
        now: DateTime<Utc>,
    ) {
        self.watch_progress = self.watch_progress.max(reported_progress.max(0.0));
        self.watch_sessions += 1;

        if let Some(duration) = video_duration.filter(|d| *d > 0.0) {
            self.watch_percentage = (self.watch_progress / duration * 100.0).clamp(0.0, 100.0);

            if self.watch_percentage >= COMPLETION_THRESHOLD && !self.is_completed {
                self.is_completed = true;
                self.completed_at = Some(now);
            }
        }

        if let Some(device) = device_info {
            self.device_info.merge_from(device);
        }

        self.last_watched_at = now;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordProgressRequest {
    /// 已观看秒数
    #[validate(range(min = 0.0))]
    pub progress: f64,
    pub device_info: Option<DeviceInfo>,
}

/// 历史列表里返回的条目，带视频投影
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchHistoryItem {
    #[serde(flatten)]
    pub progress: WatchProgress,
    pub video_title: Option<String>,
    pub video_thumbnail: Option<String>,
    pub video_duration: Option<f64>,
    pub channel_name: Option<String>,
}

/// 用户的观看历史偏好
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchPreference {
    pub id: String,
    pub user_id: String,
    pub history_paused: bool,
    pub updated_at: DateTime<Utc>,
}

/// 跨全部观看记录聚合出的用户统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchStats {
    pub total_videos: i64,
    pub total_watch_time: f64,
    pub total_watch_time_formatted: String,
    pub completed_videos: i64,
    pub average_watch_percentage: f64,
    pub total_sessions: i64,
    pub first_watched_at: Option<DateTime<Utc>>,
    pub last_watched_at: Option<DateTime<Utc>>,
}

impl Default for WatchStats {
    fn default() -> Self {
        Self {
            total_videos: 0,
            total_watch_time: 0.0,
            total_watch_time_formatted: format_watch_time(0.0),
            completed_videos: 0,
            average_watch_percentage: 0.0,
            total_sessions: 0,
            first_watched_at: None,
            last_watched_at: None,
        }
    }
}

/// 把总秒数格式化为 "{hours}h {minutes}m"
pub fn format_watch_time(total_seconds: f64) -> String {
    let total_minutes = (total_seconds.max(0.0) / 60.0) as i64;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fresh(now: DateTime<Utc>) -> WatchProgress {
        WatchProgress::new(
            "wp-1".to_string(),
            "user-1".to_string(),
            "video-1".to_string(),
            now,
        )
    }

    #[test]
    fn test_progress_never_regresses() {
        let now = Utc::now();
        let mut record = fresh(now);

        record.apply_report(120.0, Some(600.0), None, now);
        assert_eq!(record.watch_progress, 120.0);

        record.apply_report(60.0, Some(600.0), None, now);
        assert_eq!(record.watch_progress, 120.0);

        record.apply_report(300.0, Some(600.0), None, now);
        assert_eq!(record.watch_progress, 300.0);
    }

    #[test]
    fn test_sessions_count_every_report() {
        let now = Utc::now();
        let mut record = fresh(now);

        record.apply_report(10.0, Some(600.0), None, now);
        record.apply_report(5.0, Some(600.0), None, now);
        record.apply_report(20.0, Some(600.0), None, now);
        assert_eq!(record.watch_sessions, 3);
    }

    #[test]
    fn test_completion_at_ninety_percent_is_one_way() {
        // 时长 600 秒，540 秒正好到 90%
        let now = Utc::now();
        let mut record = fresh(now);

        record.apply_report(540.0, Some(600.0), None, now);
        assert_eq!(record.watch_percentage, 90.0);
        assert!(record.is_completed);
        assert!(record.completed_at.is_some());
        let completed_at = record.completed_at;

        // 更低的上报不会回退进度，也不会清除完成标记
        record.apply_report(300.0, Some(600.0), None, now);
        assert_eq!(record.watch_progress, 540.0);
        assert!(record.is_completed);
        assert_eq!(record.completed_at, completed_at);
    }

    #[test]
    fn test_unknown_duration_keeps_prior_percentage() {
        let now = Utc::now();
        let mut record = fresh(now);

        record.apply_report(300.0, Some(600.0), None, now);
        assert_eq!(record.watch_percentage, 50.0);

        // 视频查不到或时长非法时跳过重算
        record.apply_report(600.0, None, None, now);
        assert_eq!(record.watch_percentage, 50.0);
        record.apply_report(600.0, Some(0.0), None, now);
        assert_eq!(record.watch_percentage, 50.0);
        assert!(!record.is_completed);
    }

    #[test]
    fn test_percentage_capped_at_hundred() {
        let now = Utc::now();
        let mut record = fresh(now);

        record.apply_report(900.0, Some(600.0), None, now);
        assert_eq!(record.watch_percentage, 100.0);
    }

    #[test]
    fn test_negative_report_clamped() {
        let now = Utc::now();
        let mut record = fresh(now);

        record.apply_report(-30.0, Some(600.0), None, now);
        assert_eq!(record.watch_progress, 0.0);
        assert_eq!(record.watch_percentage, 0.0);
    }

    #[test]
    fn test_device_info_merge_keeps_missing_fields() {
        let now = Utc::now();
        let mut record = fresh(now);

        record.apply_report(
            10.0,
            Some(600.0),
            Some(&DeviceInfo {
                user_agent: Some("Mozilla/5.0".to_string()),
                platform: Some("macOS".to_string()),
                browser: Some("Firefox".to_string()),
            }),
            now,
        );

        record.apply_report(
            20.0,
            Some(600.0),
            Some(&DeviceInfo {
                browser: Some("Chrome".to_string()),
                ..DeviceInfo::default()
            }),
            now,
        );

        assert_eq!(record.device_info.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(record.device_info.platform.as_deref(), Some("macOS"));
        assert_eq!(record.device_info.browser.as_deref(), Some("Chrome"));
    }

    #[test]
    fn test_format_watch_time() {
        assert_eq!(format_watch_time(0.0), "0h 0m");
        assert_eq!(format_watch_time(59.0), "0h 0m");
        assert_eq!(format_watch_time(3725.0), "1h 2m");
        assert_eq!(format_watch_time(7200.0), "2h 0m");
    }

    proptest! {
        // 上报顺序不影响最终进度：永远等于最大值
        #[test]
        fn prop_progress_is_max_of_reports(mut reports in proptest::collection::vec(0.0f64..10_000.0, 1..20)) {
            let now = Utc::now();
            let mut record = fresh(now);
            for &r in &reports {
                record.apply_report(r, Some(10_000.0), None, now);
            }
            let expected = reports.iter().cloned().fold(0.0f64, f64::max);
            prop_assert_eq!(record.watch_progress, expected);
            prop_assert_eq!(record.watch_sessions as usize, reports.len());

            // 任意重排后结果一致
            reports.reverse();
            let mut reordered = fresh(now);
            for &r in &reports {
                reordered.apply_report(r, Some(10_000.0), None, now);
            }
            prop_assert_eq!(reordered.watch_progress, record.watch_progress);
        }
    }
}
