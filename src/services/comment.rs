use crate::{
    error::{AppError, Result},
    models::{comment::*, video::Video},
    services::{database::PaginatedResult, Database, NotificationService},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct CommentService {
    db: Arc<Database>,
    notification_service: NotificationService,
}

impl CommentService {
    pub async fn new(db: Arc<Database>, notification_service: NotificationService) -> Result<Self> {
        Ok(Self {
            db,
            notification_service,
        })
    }

    /// 发表评论或一级回复，并通知视频所有者/被回复者（尽力而为）
    pub async fn create_comment(
        &self,
        user_id: &str,
        request: CreateCommentRequest,
    ) -> Result<Comment> {
        debug!("Creating comment on video: {}", request.video_id);

        request.validate().map_err(AppError::ValidatorError)?;

        let video: Video = self
            .db
            .get_by_id("video", &request.video_id)
            .await?
            .ok_or_else(|| AppError::not_found("Video"))?;

        if !video.is_published {
            return Err(AppError::forbidden("Cannot comment on unpublished videos"));
        }

        if let Some(parent_id) = &request.parent_id {
            let parent: Comment = self
                .db
                .get_by_id("comment", parent_id)
                .await?
                .filter(|c: &Comment| !c.is_deleted)
                .ok_or_else(|| AppError::not_found("Parent comment"))?;

            if parent.video_id != request.video_id {
                return Err(AppError::bad_request("Parent comment belongs to another video"));
            }
            // 只允许一级回复
            if parent.parent_id.is_some() {
                return Err(AppError::bad_request("Replies cannot be nested"));
            }
        }

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            video_id: request.video_id.clone(),
            author_id: user_id.to_string(),
            parent_id: request.parent_id.clone(),
            content: request.content,
            like_count: 0,
            is_edited: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        self.db.create("comment", &comment).await?;
        self.update_video_comment_count(&request.video_id).await?;

        let notified = match &request.parent_id {
            Some(parent_id) => {
                self.notification_service
                    .notify_comment_reply(user_id, parent_id, &comment.id)
                    .await
            }
            None => {
                self.notification_service
                    .notify_video_comment(user_id, &request.video_id, &comment.id)
                    .await
            }
        };
        if let Err(e) = notified {
            warn!("Failed to send comment notification: {}", e);
        }

        Ok(comment)
    }

    pub async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        let comment: Option<Comment> = self.db.get_by_id("comment", comment_id).await?;
        Ok(comment.filter(|c| !c.is_deleted))
    }

    /// 视频下的评论列表，最新在前，附带作者投影
    pub async fn get_video_comments(
        &self,
        video_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<PaginatedResult<CommentWithAuthor>> {
        let page = page.max(1);
        let limit = limit.clamp(1, self.db.config.max_page_size);
        let offset = (page - 1) * limit;

        let mut response = self
            .db
            .query_with_params(
                "SELECT count() AS count FROM comment WHERE video_id = $video_id AND is_deleted = false GROUP ALL",
                json!({ "video_id": video_id }),
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
                    SELECT *, meta::id(id) AS id FROM comment
                    WHERE video_id = $video_id AND is_deleted = false
                    ORDER BY created_at DESC
                    LIMIT $limit START $offset
                "#,
                json!({ "video_id": video_id, "limit": limit, "offset": offset }),
            )
            .await?;
        let comments: Vec<Comment> = response.take(0)?;

        // 批量解析作者投影
        let author_ids: Vec<String> = {
            let mut ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
            ids.sort();
            ids.dedup();
            ids
        };

        let mut authors: HashMap<String, Value> = HashMap::new();
        if !author_ids.is_empty() {
            let mut response = self
                .db
                .query_with_params(
                    r#"
                        SELECT user_id, username, display_name, avatar_url
                        FROM channel_profile
                        WHERE user_id IN $author_ids
                    "#,
                    json!({ "author_ids": author_ids }),
                )
                .await?;
            let rows: Vec<Value> = response.take(0)?;
            for row in rows {
                if let Some(user_id) = row.get("user_id").and_then(|v| v.as_str()) {
                    authors.insert(user_id.to_string(), row.clone());
                }
            }
        }

        let data = comments
            .into_iter()
            .map(|comment| {
                let author = authors.get(&comment.author_id).cloned().unwrap_or(json!({}));
                CommentWithAuthor {
                    author_username: author
                        .get("username")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    author_display_name: author
                        .get("display_name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    author_avatar: author
                        .get("avatar_url")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string()),
                    comment,
                }
            })
            .collect();

        Ok(PaginatedResult::new(data, total, page, limit))
    }

    pub async fn update_comment(
        &self,
        comment_id: &str,
        user_id: &str,
        request: UpdateCommentRequest,
    ) -> Result<Comment> {
        request.validate().map_err(AppError::ValidatorError)?;

        let comment = self.owned_comment(comment_id, user_id).await?;

        self.db
            .update_by_id_with_json(
                "comment",
                &comment.id,
                json!({
                    "content": request.content,
                    "is_edited": true,
                    "updated_at": Utc::now(),
                }),
            )
            .await?
            .ok_or_else(|| AppError::internal("Failed to update comment"))
    }

    /// 软删除评论，保留回复树结构
    pub async fn delete_comment(&self, comment_id: &str, user_id: &str) -> Result<()> {
        let comment = self.owned_comment(comment_id, user_id).await?;

        self.db
            .update_by_id_with_json::<Comment>(
                "comment",
                &comment.id,
                json!({ "is_deleted": true, "updated_at": Utc::now() }),
            )
            .await?;

        self.update_video_comment_count(&comment.video_id).await?;
        Ok(())
    }

    async fn owned_comment(&self, comment_id: &str, user_id: &str) -> Result<Comment> {
        let comment: Comment = self
            .db
            .get_by_id("comment", comment_id)
            .await?
            .filter(|c: &Comment| !c.is_deleted)
            .ok_or_else(|| AppError::not_found("Comment"))?;

        if comment.author_id != user_id {
            return Err(AppError::forbidden("You can only modify your own comments"));
        }

        Ok(comment)
    }

    async fn update_video_comment_count(&self, video_id: &str) -> Result<()> {
        self.db
            .query_with_params(
                r#"
                    LET $count = (SELECT count() AS count FROM comment WHERE video_id = $video_id AND is_deleted = false GROUP ALL)[0].count ?? 0;
                    UPDATE type::thing('video', $video_id) SET comment_count = $count;
                "#,
                json!({ "video_id": video_id }),
            )
            .await?;
        Ok(())
    }
}
