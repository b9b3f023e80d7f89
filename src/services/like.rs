use crate::{
    error::{AppError, Result},
    models::{comment::Comment, like::*, tweet::Tweet, video::Video},
    services::{Database, NotificationService},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct LikeService {
    db: Arc<Database>,
    notification_service: NotificationService,
}

impl LikeService {
    pub async fn new(db: Arc<Database>, notification_service: NotificationService) -> Result<Self> {
        Ok(Self {
            db,
            notification_service,
        })
    }

    /// 点赞/取消点赞开关。新增点赞时通知内容所有者（尽力而为）；
    /// 视频点赞在通知类型里没有对应项，只更新计数。
    pub async fn toggle_like(
        &self,
        user_id: &str,
        target_kind: LikeTargetKind,
        target_id: &str,
    ) -> Result<LikeToggleResult> {
        debug!("Toggling {:?} like on {} by user {}", target_kind, target_id, user_id);

        self.ensure_target_exists(target_kind, target_id).await?;

        let mut response = self
            .db
            .query_with_params(
                r#"
                    SELECT meta::id(id) AS id FROM like
                    WHERE user_id = $user_id AND target_kind = $target_kind AND target_id = $target_id
                    LIMIT 1
                "#,
                json!({
                    "user_id": user_id,
                    "target_kind": target_kind,
                    "target_id": target_id,
                }),
            )
            .await?;
        let existing: Vec<Value> = response.take(0)?;

        let liked = match existing.first().and_then(|v| v.get("id")).and_then(|v| v.as_str()) {
            Some(like_id) => {
                self.db.delete_by_id("like", like_id).await?;
                false
            }
            None => {
                let like = Like {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    target_kind,
                    target_id: target_id.to_string(),
                    created_at: Utc::now(),
                };
                self.db.create("like", &like).await?;

                let notified = match target_kind {
                    LikeTargetKind::Comment => {
                        self.notification_service
                            .notify_comment_like(user_id, target_id)
                            .await
                    }
                    LikeTargetKind::Tweet => {
                        self.notification_service
                            .notify_tweet_like(user_id, target_id)
                            .await
                    }
                    LikeTargetKind::Video => Ok(None),
                };
                if let Err(e) = notified {
                    warn!("Failed to send like notification: {}", e);
                }

                true
            }
        };

        let like_count = self.update_target_like_count(target_kind, target_id).await?;

        Ok(LikeToggleResult { liked, like_count })
    }

    pub async fn is_liked(
        &self,
        user_id: &str,
        target_kind: LikeTargetKind,
        target_id: &str,
    ) -> Result<bool> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                    SELECT count() AS count FROM like
                    WHERE user_id = $user_id AND target_kind = $target_kind AND target_id = $target_id
                    GROUP ALL
                "#,
                json!({
                    "user_id": user_id,
                    "target_kind": target_kind,
                    "target_id": target_id,
                }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        let count = rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        Ok(count > 0)
    }

    async fn ensure_target_exists(
        &self,
        target_kind: LikeTargetKind,
        target_id: &str,
    ) -> Result<()> {
        let found = match target_kind {
            LikeTargetKind::Video => {
                let video: Option<Video> = self.db.get_by_id("video", target_id).await?;
                video.map(|v| v.is_published).unwrap_or(false)
            }
            LikeTargetKind::Comment => {
                let comment: Option<Comment> = self.db.get_by_id("comment", target_id).await?;
                comment.map(|c| !c.is_deleted).unwrap_or(false)
            }
            LikeTargetKind::Tweet => {
                let tweet: Option<Tweet> = self.db.get_by_id("tweet", target_id).await?;
                tweet.is_some()
            }
        };

        if !found {
            return Err(AppError::not_found("Like target"));
        }
        Ok(())
    }

    /// 重算目标的点赞数并回写，返回最新值
    async fn update_target_like_count(
        &self,
        target_kind: LikeTargetKind,
        target_id: &str,
    ) -> Result<i64> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                    SELECT count() AS count FROM like
                    WHERE target_kind = $target_kind AND target_id = $target_id
                    GROUP ALL
                "#,
                json!({ "target_kind": target_kind, "target_id": target_id }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        let count = rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        self.db
            .query_with_params(
                "UPDATE type::thing($table, $id) SET like_count = $count",
                json!({ "table": target_kind.table(), "id": target_id, "count": count }),
            )
            .await?;

        Ok(count)
    }
}
