use crate::{
    error::{AppError, Result},
    models::{video::Video, watch_history::*},
    services::{database::PaginatedResult, Database},
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct WatchHistoryService {
    db: Arc<Database>,
}

impl WatchHistoryService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 记录一次进度上报。
    ///
    /// 按 (user, video) 对 upsert：首次上报创建记录，之后的上报
    /// 取进度最大值合并。同一对上的并发上报由唯一索引兜底，
    /// 后写覆盖先写是可接受的弱一致取舍。
    pub async fn record_progress(
        &self,
        user_id: &str,
        video_id: &str,
        request: RecordProgressRequest,
    ) -> Result<WatchProgress> {
        request.validate().map_err(AppError::ValidatorError)?;

        debug!(
            "Recording progress {}s for user {} on video {}",
            request.progress, user_id, video_id
        );

        // 时长来自视频记录；查不到或时长非法时跳过百分比和完成判定
        let video: Option<Video> = self.db.get_by_id("video", video_id).await?;
        let duration = video.map(|v| v.duration);

        let existing = self.find_record(user_id, video_id).await?;
        let now = Utc::now();

        let mut record = match existing {
            Some(record) => record,
            None => WatchProgress::new(
                Uuid::new_v4().to_string(),
                user_id.to_string(),
                video_id.to_string(),
                now,
            ),
        };
        let is_new = record.watch_sessions == 0;

        record.apply_report(request.progress, duration, request.device_info.as_ref(), now);

        if is_new {
            self.db.create("watch_progress", &record).await?;
        } else {
            // 记录 ID 不参与合并更新
            let mut updates = serde_json::to_value(&record)?;
            if let Some(map) = updates.as_object_mut() {
                map.remove("id");
            }
            self.db
                .update_by_id_with_json::<WatchProgress>("watch_progress", &record.id, updates)
                .await?;
        }

        Ok(record)
    }

    /// 分页获取观看历史，最近观看在前，附带视频投影
    pub async fn get_history(
        &self,
        user_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<PaginatedResult<WatchHistoryItem>> {
        let page = page.max(1);
        let limit = limit.clamp(1, self.db.config.max_page_size);
        let offset = (page - 1) * limit;

        let mut response = self
            .db
            .query_with_params(
                "SELECT count() AS count FROM watch_progress WHERE user_id = $user_id GROUP ALL",
                json!({ "user_id": user_id }),
            )
            .await?;
        let count_rows: Vec<Value> = response.take(0)?;
        let total = count_rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0) as usize;

        let mut response = self
            .db
            .query_with_params(
                r#"
                    SELECT *, meta::id(id) AS id FROM watch_progress
                    WHERE user_id = $user_id
                    ORDER BY last_watched_at DESC
                    LIMIT $limit START $offset
                "#,
                json!({ "user_id": user_id, "limit": limit, "offset": offset }),
            )
            .await?;
        let records: Vec<WatchProgress> = response.take(0)?;

        let mut data = Vec::with_capacity(records.len());
        for progress in records {
            let video: Option<Video> = self.db.get_by_id("video", &progress.video_id).await?;
            let channel_name = match &video {
                Some(v) => {
                    let mut response = self
                        .db
                        .query_with_params(
                            "SELECT display_name FROM channel_profile WHERE user_id = $user_id LIMIT 1",
                            json!({ "user_id": v.owner_id }),
                        )
                        .await?;
                    let rows: Vec<Value> = response.take(0)?;
                    rows.first()
                        .and_then(|r| r.get("display_name"))
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                }
                None => None,
            };

            data.push(WatchHistoryItem {
                video_title: video.as_ref().map(|v| v.title.clone()),
                video_thumbnail: video.as_ref().and_then(|v| v.thumbnail_url.clone()),
                video_duration: video.as_ref().map(|v| v.duration),
                channel_name,
                progress,
            });
        }

        Ok(PaginatedResult::new(data, total, page, limit))
    }

    /// 跨用户全部观看记录的聚合统计。没有记录时返回零值默认。
    pub async fn get_user_stats(&self, user_id: &str) -> Result<WatchStats> {
        debug!("Getting watch stats for user: {}", user_id);

        let mut response = self
            .db
            .query_with_params(
                r#"
                    SELECT
                        count() AS total_videos,
                        math::sum(watch_progress) AS total_watch_time,
                        math::sum(watch_sessions) AS total_sessions,
                        math::mean(watch_percentage) AS average_watch_percentage
                    FROM watch_progress
                    WHERE user_id = $user_id
                    GROUP ALL
                "#,
                json!({ "user_id": user_id }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;

        let Some(stat) = rows.into_iter().next() else {
            return Ok(WatchStats::default());
        };

        let mut response = self
            .db
            .query_with_params(
                "SELECT count() AS count FROM watch_progress WHERE user_id = $user_id AND is_completed = true GROUP ALL",
                json!({ "user_id": user_id }),
            )
            .await?;
        let completed_rows: Vec<Value> = response.take(0)?;
        let completed_videos = completed_rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let first_watched_at = self.boundary_timestamp(user_id, "created_at", "ASC").await?;
        let last_watched_at = self.boundary_timestamp(user_id, "last_watched_at", "DESC").await?;

        let total_watch_time = stat
            .get("total_watch_time")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        Ok(WatchStats {
            total_videos: stat.get("total_videos").and_then(|v| v.as_i64()).unwrap_or(0),
            total_watch_time,
            total_watch_time_formatted: format_watch_time(total_watch_time),
            completed_videos,
            average_watch_percentage: stat
                .get("average_watch_percentage")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0),
            total_sessions: stat.get("total_sessions").and_then(|v| v.as_i64()).unwrap_or(0),
            first_watched_at,
            last_watched_at,
        })
    }

    /// 清空观看历史，返回删除条数
    pub async fn clear_history(&self, user_id: &str) -> Result<usize> {
        let mut response = self
            .db
            .query_with_params(
                "DELETE watch_progress WHERE user_id = $user_id RETURN BEFORE",
                json!({ "user_id": user_id }),
            )
            .await?;
        let deleted: Vec<Value> = response.take(0)?;
        debug!("Cleared {} watch records for user {}", deleted.len(), user_id);
        Ok(deleted.len())
    }

    /// 从历史中移除单个视频的记录
    pub async fn remove_video(&self, user_id: &str, video_id: &str) -> Result<()> {
        self.db
            .query_with_params(
                "DELETE watch_progress WHERE user_id = $user_id AND video_id = $video_id",
                json!({ "user_id": user_id, "video_id": video_id }),
            )
            .await?
            .check()?;
        Ok(())
    }

    /// 暂停观看历史记录
    pub async fn pause_history(&self, user_id: &str) -> Result<WatchPreference> {
        self.set_history_paused(user_id, true).await
    }

    /// 恢复观看历史记录
    pub async fn resume_history(&self, user_id: &str) -> Result<WatchPreference> {
        self.set_history_paused(user_id, false).await
    }

    pub async fn is_history_paused(&self, user_id: &str) -> Result<bool> {
        let preference: Option<WatchPreference> =
            self.db.find_one("watch_preference", "user_id", user_id).await?;
        Ok(preference.map(|p| p.history_paused).unwrap_or(false))
    }

    async fn set_history_paused(&self, user_id: &str, paused: bool) -> Result<WatchPreference> {
        let existing: Option<WatchPreference> =
            self.db.find_one("watch_preference", "user_id", user_id).await?;
        let now = Utc::now();

        match existing {
            Some(mut preference) => {
                preference.history_paused = paused;
                preference.updated_at = now;
                self.db
                    .update_by_id_with_json::<WatchPreference>(
                        "watch_preference",
                        &preference.id,
                        json!({ "history_paused": paused, "updated_at": now }),
                    )
                    .await?;
                Ok(preference)
            }
            None => {
                let preference = WatchPreference {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    history_paused: paused,
                    updated_at: now,
                };
                self.db.create("watch_preference", &preference).await?;
                Ok(preference)
            }
        }
    }

    async fn find_record(&self, user_id: &str, video_id: &str) -> Result<Option<WatchProgress>> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                    SELECT *, meta::id(id) AS id FROM watch_progress
                    WHERE user_id = $user_id AND video_id = $video_id
                    LIMIT 1
                "#,
                json!({ "user_id": user_id, "video_id": video_id }),
            )
            .await?;
        let records: Vec<WatchProgress> = response.take(0)?;
        Ok(records.into_iter().next())
    }

    async fn boundary_timestamp(
        &self,
        user_id: &str,
        field: &str,
        direction: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let sql = format!(
            "SELECT {field} FROM watch_progress WHERE user_id = $user_id ORDER BY {field} {direction} LIMIT 1",
        );
        let mut response = self
            .db
            .query_with_params(&sql, json!({ "user_id": user_id }))
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        Ok(rows
            .first()
            .and_then(|r| r.get(field))
            .and_then(|v| serde_json::from_value(v.clone()).ok()))
    }
}
