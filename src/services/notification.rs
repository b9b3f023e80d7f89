use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        comment::Comment,
        notification::*,
        tweet::Tweet,
        user::ChannelProfile,
        video::Video,
    },
    services::{database::PaginatedResult, Database},
    utils::validation::truncate_excerpt,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

/// 引用内容（评论、动态正文）在通知文案里的最大字符数
const EXCERPT_MAX_CHARS: usize = 100;

/// 系统类确认通知的保留期
const TRANSIENT_NOTIFICATION_TTL_DAYS: i64 = 30;

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<Database>,
    config: Config,
}

/// 自我通知抑制：用户不会收到自己动作产生的通知，系统通知除外
fn is_self_notification(
    sender_id: Option<&str>,
    recipient_id: &str,
    notification_type: NotificationType,
) -> bool {
    sender_id == Some(recipient_id) && notification_type != NotificationType::System
}

impl NotificationService {
    pub async fn new(db: Arc<Database>, config: &Config) -> Result<Self> {
        Ok(Self {
            db,
            config: config.clone(),
        })
    }

    /// 创建并持久化一条通知。
    ///
    /// 返回 `None` 表示按规则抑制（自我通知），不是错误。
    /// 多个关联实体字段同时出现时校验失败，不写入任何记录。
    pub async fn create_notification(
        &self,
        request: CreateNotificationRequest,
    ) -> Result<Option<Notification>> {
        request.validate().map_err(AppError::ValidatorError)?;
        let related = request.related_entity()?;

        if let Some(action_url) = &request.action_url {
            url::Url::parse(action_url)
                .map_err(|_| AppError::validation("action_url must be an absolute URL"))?;
        }

        if is_self_notification(
            request.sender_id.as_deref(),
            &request.recipient_id,
            request.notification_type,
        ) {
            debug!(
                "Suppressing self-notification for user {}",
                request.recipient_id
            );
            return Ok(None);
        }

        let now = Utc::now();
        let mut notification = Notification {
            id: Uuid::new_v4().to_string(),
            recipient_id: request.recipient_id,
            sender_id: request.sender_id,
            notification_type: request.notification_type,
            title: request.title,
            message: request.message,
            is_read: false,
            related_video: None,
            related_comment: None,
            related_tweet: None,
            related_channel: None,
            action_url: request.action_url,
            context: request.context.unwrap_or_default(),
            expires_at: request.expires_at,
            created_at: now,
            updated_at: now,
        };
        notification.set_related_entity(related);

        self.db.create("notification", &notification).await?;
        debug!(
            "Created {:?} notification {} for user {}",
            notification.notification_type, notification.id, notification.recipient_id
        );

        Ok(Some(notification))
    }

    // ---- 事件构建器 ----
    //
    // 每个构建器按 ID 解析涉及的实体；任何必需实体已不存在时返回
    // Ok(None) 而不是错误，指向已删除内容的事件被静默丢弃。

    /// 视频发布成功的系统确认
    pub async fn notify_video_upload_success(
        &self,
        owner_id: &str,
        video_id: &str,
    ) -> Result<Option<Notification>> {
        let Some(video) = self.video_by_id(video_id).await? else {
            debug!("Video {} not found, dropping upload notification", video_id);
            return Ok(None);
        };

        self.create_notification(CreateNotificationRequest {
            recipient_id: owner_id.to_string(),
            sender_id: None,
            notification_type: NotificationType::VideoUploadSuccess,
            title: "Video published".to_string(),
            message: format!(
                "Your video \"{}\" was processed successfully and is now live",
                truncate_excerpt(&video.title, EXCERPT_MAX_CHARS)
            ),
            related_video: Some(video.id.clone()),
            related_comment: None,
            related_tweet: None,
            related_channel: None,
            action_url: Some(self.watch_url(&video.id)),
            context: Some(HashMap::from([
                ("video_title".to_string(), json!(video.title)),
                ("thumbnail_url".to_string(), json!(video.thumbnail_url)),
            ])),
            expires_at: Some(Utc::now() + Duration::days(TRANSIENT_NOTIFICATION_TTL_DAYS)),
        })
        .await
    }

    /// 有人评论了你的视频
    pub async fn notify_video_comment(
        &self,
        commenter_id: &str,
        video_id: &str,
        comment_id: &str,
    ) -> Result<Option<Notification>> {
        let Some(video) = self.video_by_id(video_id).await? else {
            debug!("Video {} not found, dropping comment notification", video_id);
            return Ok(None);
        };
        let Some(comment) = self.comment_by_id(comment_id).await? else {
            debug!("Comment {} not found, dropping comment notification", comment_id);
            return Ok(None);
        };
        let Some(commenter) = self.profile_by_user_id(commenter_id).await? else {
            debug!("Profile {} not found, dropping comment notification", commenter_id);
            return Ok(None);
        };

        let excerpt = truncate_excerpt(&comment.content, EXCERPT_MAX_CHARS);
        self.create_notification(CreateNotificationRequest {
            recipient_id: video.owner_id.clone(),
            sender_id: Some(commenter_id.to_string()),
            notification_type: NotificationType::VideoComment,
            title: "New comment on your video".to_string(),
            message: format!(
                "{} commented on \"{}\": {}",
                commenter.display_name,
                truncate_excerpt(&video.title, EXCERPT_MAX_CHARS),
                excerpt
            ),
            related_video: Some(video.id.clone()),
            related_comment: None,
            related_tweet: None,
            related_channel: None,
            action_url: Some(format!("{}?comment={}", self.watch_url(&video.id), comment.id)),
            context: Some(HashMap::from([
                ("sender_name".to_string(), json!(commenter.display_name)),
                ("sender_avatar".to_string(), json!(commenter.avatar_url)),
                ("video_title".to_string(), json!(video.title)),
                ("comment_excerpt".to_string(), json!(excerpt)),
            ])),
            expires_at: None,
        })
        .await
    }

    /// 有人回复了你的评论
    pub async fn notify_comment_reply(
        &self,
        replier_id: &str,
        parent_comment_id: &str,
        reply_id: &str,
    ) -> Result<Option<Notification>> {
        let Some(parent) = self.comment_by_id(parent_comment_id).await? else {
            debug!("Parent comment {} not found, dropping reply notification", parent_comment_id);
            return Ok(None);
        };
        let Some(reply) = self.comment_by_id(reply_id).await? else {
            debug!("Reply {} not found, dropping reply notification", reply_id);
            return Ok(None);
        };
        let Some(replier) = self.profile_by_user_id(replier_id).await? else {
            debug!("Profile {} not found, dropping reply notification", replier_id);
            return Ok(None);
        };

        let excerpt = truncate_excerpt(&reply.content, EXCERPT_MAX_CHARS);
        self.create_notification(CreateNotificationRequest {
            recipient_id: parent.author_id.clone(),
            sender_id: Some(replier_id.to_string()),
            notification_type: NotificationType::CommentReply,
            title: "New reply to your comment".to_string(),
            message: format!("{} replied: {}", replier.display_name, excerpt),
            related_video: None,
            related_comment: Some(reply.id.clone()),
            related_tweet: None,
            related_channel: None,
            action_url: Some(format!(
                "{}?comment={}",
                self.watch_url(&parent.video_id),
                reply.id
            )),
            context: Some(HashMap::from([
                ("sender_name".to_string(), json!(replier.display_name)),
                ("sender_avatar".to_string(), json!(replier.avatar_url)),
                ("reply_excerpt".to_string(), json!(excerpt)),
                (
                    "parent_excerpt".to_string(),
                    json!(truncate_excerpt(&parent.content, EXCERPT_MAX_CHARS)),
                ),
            ])),
            expires_at: None,
        })
        .await
    }

    /// 有人赞了你的评论
    pub async fn notify_comment_like(
        &self,
        liker_id: &str,
        comment_id: &str,
    ) -> Result<Option<Notification>> {
        let Some(comment) = self.comment_by_id(comment_id).await? else {
            debug!("Comment {} not found, dropping like notification", comment_id);
            return Ok(None);
        };
        let Some(liker) = self.profile_by_user_id(liker_id).await? else {
            debug!("Profile {} not found, dropping like notification", liker_id);
            return Ok(None);
        };

        let excerpt = truncate_excerpt(&comment.content, EXCERPT_MAX_CHARS);
        self.create_notification(CreateNotificationRequest {
            recipient_id: comment.author_id.clone(),
            sender_id: Some(liker_id.to_string()),
            notification_type: NotificationType::CommentLike,
            title: "Your comment was liked".to_string(),
            message: format!("{} liked your comment: {}", liker.display_name, excerpt),
            related_video: None,
            related_comment: Some(comment.id.clone()),
            related_tweet: None,
            related_channel: None,
            action_url: Some(format!(
                "{}?comment={}",
                self.watch_url(&comment.video_id),
                comment.id
            )),
            context: Some(HashMap::from([
                ("sender_name".to_string(), json!(liker.display_name)),
                ("sender_avatar".to_string(), json!(liker.avatar_url)),
                ("comment_excerpt".to_string(), json!(excerpt)),
            ])),
            expires_at: None,
        })
        .await
    }

    /// 有人赞了你的动态
    pub async fn notify_tweet_like(
        &self,
        liker_id: &str,
        tweet_id: &str,
    ) -> Result<Option<Notification>> {
        let Some(tweet) = self.tweet_by_id(tweet_id).await? else {
            debug!("Tweet {} not found, dropping like notification", tweet_id);
            return Ok(None);
        };
        let Some(liker) = self.profile_by_user_id(liker_id).await? else {
            debug!("Profile {} not found, dropping like notification", liker_id);
            return Ok(None);
        };

        let excerpt = truncate_excerpt(&tweet.content, EXCERPT_MAX_CHARS);
        self.create_notification(CreateNotificationRequest {
            recipient_id: tweet.owner_id.clone(),
            sender_id: Some(liker_id.to_string()),
            notification_type: NotificationType::TweetLike,
            title: "Your post was liked".to_string(),
            message: format!("{} liked your post: {}", liker.display_name, excerpt),
            related_video: None,
            related_comment: None,
            related_tweet: Some(tweet.id.clone()),
            related_channel: None,
            action_url: Some(format!("{}/posts/{}", self.config.frontend_url, tweet.id)),
            context: Some(HashMap::from([
                ("sender_name".to_string(), json!(liker.display_name)),
                ("sender_avatar".to_string(), json!(liker.avatar_url)),
                ("tweet_excerpt".to_string(), json!(excerpt)),
            ])),
            expires_at: None,
        })
        .await
    }

    /// 新订阅者
    pub async fn notify_new_subscription(
        &self,
        subscriber_id: &str,
        channel_user_id: &str,
    ) -> Result<Option<Notification>> {
        let Some(subscriber) = self.profile_by_user_id(subscriber_id).await? else {
            debug!("Profile {} not found, dropping subscription notification", subscriber_id);
            return Ok(None);
        };

        self.create_notification(CreateNotificationRequest {
            recipient_id: channel_user_id.to_string(),
            sender_id: Some(subscriber_id.to_string()),
            notification_type: NotificationType::NewSubscription,
            title: "New subscriber".to_string(),
            message: format!("{} subscribed to your channel", subscriber.display_name),
            related_video: None,
            related_comment: None,
            related_tweet: None,
            related_channel: Some(subscriber_id.to_string()),
            action_url: Some(format!(
                "{}/channel/{}",
                self.config.frontend_url, subscriber.username
            )),
            context: Some(HashMap::from([
                ("sender_name".to_string(), json!(subscriber.display_name)),
                ("sender_avatar".to_string(), json!(subscriber.avatar_url)),
            ])),
            expires_at: None,
        })
        .await
    }

    /// 内容被删除的系统通知
    pub async fn notify_content_deletion(
        &self,
        owner_id: &str,
        kind: DeletedContentKind,
        content_title: &str,
    ) -> Result<Option<Notification>> {
        self.create_notification(CreateNotificationRequest {
            recipient_id: owner_id.to_string(),
            sender_id: None,
            notification_type: NotificationType::ContentDeletion,
            title: "Content removed".to_string(),
            message: format!(
                "Your {} \"{}\" has been deleted",
                kind.display_name(),
                truncate_excerpt(content_title, EXCERPT_MAX_CHARS)
            ),
            related_video: None,
            related_comment: None,
            related_tweet: None,
            related_channel: None,
            action_url: None,
            context: Some(HashMap::from([
                ("content_kind".to_string(), json!(kind)),
                ("content_title".to_string(), json!(content_title)),
            ])),
            expires_at: Some(Utc::now() + Duration::days(TRANSIENT_NOTIFICATION_TTL_DAYS)),
        })
        .await
    }

    // ---- 查询与读状态 ----

    /// 分页获取用户的通知，最新在前，附带发送者公开投影。
    /// 页码从 1 开始，越界页返回空列表。
    pub async fn get_user_notifications(
        &self,
        user_id: &str,
        page: usize,
        limit: usize,
        unread_only: bool,
    ) -> Result<PaginatedResult<NotificationWithSender>> {
        debug!("Getting notifications for user: {} (page {})", user_id, page);

        let page = page.max(1);
        let limit = limit.clamp(1, self.config.max_page_size);
        let offset = (page - 1) * limit;

        let unread_clause = if unread_only { "AND is_read = false" } else { "" };

        let count_query = format!(
            "SELECT count() AS count FROM notification WHERE recipient_id = $user_id {} GROUP ALL",
            unread_clause
        );
        let mut response = self
            .db
            .query_with_params(&count_query, json!({ "user_id": user_id }))
            .await?;
        let count_rows: Vec<Value> = response.take(0)?;
        let total = count_rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0) as usize;

        let list_query = format!(
            r#"
                SELECT *, meta::id(id) AS id FROM notification
                WHERE recipient_id = $user_id {}
                ORDER BY created_at DESC, id DESC
                LIMIT $limit START $offset
            "#,
            unread_clause
        );
        let mut response = self
            .db
            .query_with_params(
                &list_query,
                json!({ "user_id": user_id, "limit": limit, "offset": offset }),
            )
            .await?;
        let notifications: Vec<Notification> = response.take(0)?;

        // 批量拉取发送者投影，避免逐条查询
        let sender_ids: Vec<String> = {
            let mut ids: Vec<String> = notifications
                .iter()
                .filter_map(|n| n.sender_id.clone())
                .collect();
            ids.sort();
            ids.dedup();
            ids
        };

        let mut senders: HashMap<String, SenderInfo> = HashMap::new();
        if !sender_ids.is_empty() {
            let mut response = self
                .db
                .query_with_params(
                    r#"
                        SELECT user_id, username, display_name, avatar_url
                        FROM channel_profile
                        WHERE user_id IN $sender_ids
                    "#,
                    json!({ "sender_ids": sender_ids }),
                )
                .await?;
            let profiles: Vec<SenderInfo> = response.take(0)?;
            for profile in profiles {
                senders.insert(profile.user_id.clone(), profile);
            }
        }

        let data = notifications
            .into_iter()
            .map(|notification| {
                let sender = notification
                    .sender_id
                    .as_ref()
                    .and_then(|id| senders.get(id))
                    .cloned();
                NotificationWithSender { notification, sender }
            })
            .collect();

        Ok(PaginatedResult::new(data, total, page, limit))
    }

    /// 未读数角标。尽力而为：查询失败时记录日志并返回 0，
    /// 绝不让一个角标拖垮页面。
    pub async fn get_unread_count(&self, user_id: &str) -> i64 {
        let result = self
            .db
            .query_with_params(
                "SELECT count() AS count FROM notification WHERE recipient_id = $user_id AND is_read = false GROUP ALL",
                json!({ "user_id": user_id }),
            )
            .await
            .and_then(|mut response| {
                let rows: Vec<Value> = response.take(0)?;
                Ok(rows
                    .first()
                    .and_then(|v| v.get("count"))
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0))
            });

        match result {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to fetch unread count for user {}: {}", user_id, e);
                0
            }
        }
    }

    /// 标记指定通知为已读。只处理属于该用户的记录，
    /// 其余 ID 静默跳过。返回受影响条数。
    pub async fn mark_notifications_as_read(
        &self,
        notification_ids: &[String],
        user_id: &str,
    ) -> Result<usize> {
        if notification_ids.is_empty() {
            return Ok(0);
        }

        let mut response = self
            .db
            .query_with_params(
                r#"
                    UPDATE notification
                    SET is_read = true, updated_at = time::now()
                    WHERE recipient_id = $user_id AND meta::id(id) IN $ids
                    RETURN AFTER
                "#,
                json!({ "user_id": user_id, "ids": notification_ids }),
            )
            .await?;
        let updated: Vec<Value> = response.take(0)?;
        Ok(updated.len())
    }

    /// 标记该用户的全部通知为已读
    pub async fn mark_all_as_read(&self, user_id: &str) -> Result<usize> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                    UPDATE notification
                    SET is_read = true, updated_at = time::now()
                    WHERE recipient_id = $user_id AND is_read = false
                    RETURN AFTER
                "#,
                json!({ "user_id": user_id }),
            )
            .await?;
        let updated: Vec<Value> = response.take(0)?;
        Ok(updated.len())
    }

    /// 删除指定通知，只处理属于该用户的记录
    pub async fn delete_notifications(
        &self,
        notification_ids: &[String],
        user_id: &str,
    ) -> Result<usize> {
        if notification_ids.is_empty() {
            return Ok(0);
        }

        let mut response = self
            .db
            .query_with_params(
                r#"
                    DELETE notification
                    WHERE recipient_id = $user_id AND meta::id(id) IN $ids
                    RETURN BEFORE
                "#,
                json!({ "user_id": user_id, "ids": notification_ids }),
            )
            .await?;
        let deleted: Vec<Value> = response.take(0)?;
        Ok(deleted.len())
    }

    /// 删除该用户的全部通知
    pub async fn delete_all(&self, user_id: &str) -> Result<usize> {
        let mut response = self
            .db
            .query_with_params(
                "DELETE notification WHERE recipient_id = $user_id RETURN BEFORE",
                json!({ "user_id": user_id }),
            )
            .await?;
        let deleted: Vec<Value> = response.take(0)?;
        Ok(deleted.len())
    }

    /// 清理已过期的通知，由周期任务驱动
    pub async fn delete_expired(&self) -> Result<usize> {
        let mut response = self
            .db
            .query(
                "DELETE notification WHERE expires_at != NONE AND type::datetime(expires_at) <= time::now() RETURN BEFORE",
            )
            .await?;
        let deleted: Vec<Value> = response.take(0)?;
        if !deleted.is_empty() {
            debug!("Swept {} expired notifications", deleted.len());
        }
        Ok(deleted.len())
    }

    // ---- 实体解析辅助 ----

    fn watch_url(&self, video_id: &str) -> String {
        format!("{}/watch/{}", self.config.frontend_url, video_id)
    }

    async fn video_by_id(&self, video_id: &str) -> Result<Option<Video>> {
        self.db.get_by_id("video", video_id).await
    }

    async fn comment_by_id(&self, comment_id: &str) -> Result<Option<Comment>> {
        let comment: Option<Comment> = self.db.get_by_id("comment", comment_id).await?;
        Ok(comment.filter(|c| !c.is_deleted))
    }

    async fn tweet_by_id(&self, tweet_id: &str) -> Result<Option<Tweet>> {
        self.db.get_by_id("tweet", tweet_id).await
    }

    async fn profile_by_user_id(&self, user_id: &str) -> Result<Option<ChannelProfile>> {
        self.db.find_one("channel_profile", "user_id", user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_notification_suppressed() {
        assert!(is_self_notification(
            Some("user-a"),
            "user-a",
            NotificationType::CommentLike
        ));
        assert!(is_self_notification(
            Some("user-a"),
            "user-a",
            NotificationType::VideoComment
        ));
    }

    #[test]
    fn test_system_notification_to_self_allowed() {
        assert!(!is_self_notification(
            Some("user-a"),
            "user-a",
            NotificationType::System
        ));
    }

    #[test]
    fn test_distinct_users_not_suppressed() {
        assert!(!is_self_notification(
            Some("user-b"),
            "user-a",
            NotificationType::CommentLike
        ));
        // 系统通知没有发送者
        assert!(!is_self_notification(
            None,
            "user-a",
            NotificationType::VideoUploadSuccess
        ));
    }
}
