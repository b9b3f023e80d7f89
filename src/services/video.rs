use crate::{
    error::{AppError, Result},
    models::{notification::DeletedContentKind, video::*},
    services::{database::PaginatedResult, Database, NotificationService},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct VideoService {
    db: Arc<Database>,
    notification_service: NotificationService,
}

impl VideoService {
    pub async fn new(db: Arc<Database>, notification_service: NotificationService) -> Result<Self> {
        Ok(Self {
            db,
            notification_service,
        })
    }

    /// 登记一个已上传到媒体主机的视频，初始为未发布
    pub async fn create_video(&self, user_id: &str, request: CreateVideoRequest) -> Result<Video> {
        request.validate().map_err(AppError::ValidatorError)?;

        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4().to_string(),
            owner_id: user_id.to_string(),
            title: request.title,
            description: request.description,
            video_url: request.video_url,
            thumbnail_url: request.thumbnail_url,
            duration: request.duration,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            is_published: false,
            created_at: now,
            updated_at: now,
        };

        self.db.create("video", &video).await?;
        self.update_channel_video_count(user_id).await?;
        info!("Video {} registered by user {}", video.id, user_id);

        Ok(video)
    }

    /// 获取视频详情。未发布的视频只有所有者可见；
    /// 已发布视频的每次读取会累加播放数。
    pub async fn get_video(&self, video_id: &str, viewer_id: Option<&str>) -> Result<VideoWithOwner> {
        let video: Video = self
            .db
            .get_by_id("video", video_id)
            .await?
            .ok_or_else(|| AppError::not_found("Video"))?;

        if !video.is_published && viewer_id != Some(video.owner_id.as_str()) {
            return Err(AppError::not_found("Video"));
        }

        if video.is_published {
            self.db
                .query_with_params(
                    "UPDATE type::thing('video', $id) SET view_count += 1",
                    json!({ "id": video.id }),
                )
                .await?
                .check()?;
        }

        self.with_owner(video).await
    }

    pub async fn get_channel_videos(
        &self,
        owner_id: &str,
        include_unpublished: bool,
        page: usize,
        limit: usize,
    ) -> Result<PaginatedResult<Video>> {
        let page = page.max(1);
        let limit = limit.clamp(1, self.db.config.max_page_size);
        let offset = (page - 1) * limit;

        let published_clause = if include_unpublished { "" } else { "AND is_published = true" };

        let count_query = format!(
            "SELECT count() AS count FROM video WHERE owner_id = $owner_id {} GROUP ALL",
            published_clause
        );
        let mut response = self
            .db
            .query_with_params(&count_query, json!({ "owner_id": owner_id }))
            .await?;
        let count_rows: Vec<Value> = response.take(0)?;
        let total = count_rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0) as usize;

        let list_query = format!(
            r#"
                SELECT *, meta::id(id) AS id FROM video
                WHERE owner_id = $owner_id {}
                ORDER BY created_at DESC
                LIMIT $limit START $offset
            "#,
            published_clause
        );
        let mut response = self
            .db
            .query_with_params(
                &list_query,
                json!({ "owner_id": owner_id, "limit": limit, "offset": offset }),
            )
            .await?;
        let videos: Vec<Video> = response.take(0)?;

        Ok(PaginatedResult::new(videos, total, page, limit))
    }

    pub async fn update_video(
        &self,
        video_id: &str,
        user_id: &str,
        request: UpdateVideoRequest,
    ) -> Result<Video> {
        request.validate().map_err(AppError::ValidatorError)?;

        let video = self.owned_video(video_id, user_id).await?;

        let mut updates = json!({ "updated_at": Utc::now() });
        if let Some(title) = &request.title {
            updates["title"] = json!(title);
        }
        if let Some(description) = &request.description {
            updates["description"] = json!(description);
        }
        if let Some(thumbnail_url) = &request.thumbnail_url {
            updates["thumbnail_url"] = json!(thumbnail_url);
        }

        self.db
            .update_by_id_with_json("video", &video.id, updates)
            .await?
            .ok_or_else(|| AppError::internal("Failed to update video"))
    }

    /// 切换发布状态。首次发布时给所有者发送成功通知（尽力而为）。
    pub async fn toggle_publish(&self, video_id: &str, user_id: &str) -> Result<Video> {
        let video = self.owned_video(video_id, user_id).await?;
        let publishing = !video.is_published;

        let updated: Video = self
            .db
            .update_by_id_with_json(
                "video",
                &video.id,
                json!({ "is_published": publishing, "updated_at": Utc::now() }),
            )
            .await?
            .ok_or_else(|| AppError::internal("Failed to update video"))?;

        if publishing {
            if let Err(e) = self
                .notification_service
                .notify_video_upload_success(user_id, &updated.id)
                .await
            {
                warn!("Failed to send upload notification for video {}: {}", updated.id, e);
            }
        }

        Ok(updated)
    }

    /// 删除视频及其从属记录，并给所有者留一条删除通知
    pub async fn delete_video(&self, video_id: &str, user_id: &str) -> Result<()> {
        let video = self.owned_video(video_id, user_id).await?;

        self.db.delete_by_id("video", &video.id).await?;

        // 清理从属记录；视频已删，这些记录不再可达
        self.db
            .query_with_params(
                r#"
                    DELETE comment WHERE video_id = $video_id;
                    DELETE like WHERE target_kind = 'video' AND target_id = $video_id;
                    DELETE watch_progress WHERE video_id = $video_id;
                "#,
                json!({ "video_id": video.id }),
            )
            .await?;

        self.update_channel_video_count(user_id).await?;

        if let Err(e) = self
            .notification_service
            .notify_content_deletion(user_id, DeletedContentKind::Video, &video.title)
            .await
        {
            warn!("Failed to send deletion notification for video {}: {}", video.id, e);
        }

        info!("Video {} deleted by user {}", video.id, user_id);
        Ok(())
    }

    async fn owned_video(&self, video_id: &str, user_id: &str) -> Result<Video> {
        let video: Video = self
            .db
            .get_by_id("video", video_id)
            .await?
            .ok_or_else(|| AppError::not_found("Video"))?;

        if video.owner_id != user_id {
            return Err(AppError::forbidden("You can only modify your own videos"));
        }

        Ok(video)
    }

    async fn with_owner(&self, video: Video) -> Result<VideoWithOwner> {
        debug!("Resolving owner for video {}", video.id);
        let mut response = self
            .db
            .query_with_params(
                "SELECT username, display_name, avatar_url FROM channel_profile WHERE user_id = $user_id LIMIT 1",
                json!({ "user_id": video.owner_id }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        let owner = rows.first().cloned().unwrap_or(json!({}));

        Ok(VideoWithOwner {
            owner_username: owner
                .get("username")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            owner_display_name: owner
                .get("display_name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            owner_avatar: owner
                .get("avatar_url")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            video,
        })
    }

    async fn update_channel_video_count(&self, user_id: &str) -> Result<()> {
        self.db
            .query_with_params(
                r#"
                    LET $count = (SELECT count() AS count FROM video WHERE owner_id = $user_id GROUP ALL)[0].count ?? 0;
                    UPDATE channel_profile SET video_count = $count WHERE user_id = $user_id;
                "#,
                json!({ "user_id": user_id }),
            )
            .await?;
        Ok(())
    }
}
