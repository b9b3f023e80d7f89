use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// 通知事件类型（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    VideoUploadSuccess,
    CommentLike,
    TweetLike,
    CommentReply,
    ContentDeletion,
    NewSubscription,
    VideoComment,
    System,
}

/// 通知关联的实体。"四选一"的约束由类型结构保证，
/// 不再依赖运行时的字段计数检查。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RelatedEntity {
    Video(String),
    Comment(String),
    Tweet(String),
    Channel(String),
}

/// 被删除内容的种类，用于 content_deletion 通知的文案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletedContentKind {
    Video,
    Comment,
    Tweet,
}

impl DeletedContentKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            DeletedContentKind::Video => "video",
            DeletedContentKind::Comment => "comment",
            DeletedContentKind::Tweet => "tweet",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    /// 触发方；系统通知为 None
    pub sender_id: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub related_video: Option<String>,
    pub related_comment: Option<String>,
    pub related_tweet: Option<String>,
    pub related_channel: Option<String>,
    pub action_url: Option<String>,
    /// 仅供渲染的反规范化数据（名称、头像、摘录），不具权威性；
    /// 缺键时按关联实体重新查询即可恢复
    pub context: HashMap<String, serde_json::Value>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// 把关联实体写进四个存储列。唯一的写入口，保证至多一列非空。
    pub fn set_related_entity(&mut self, related: Option<RelatedEntity>) {
        self.related_video = None;
        self.related_comment = None;
        self.related_tweet = None;
        self.related_channel = None;
        match related {
            Some(RelatedEntity::Video(id)) => self.related_video = Some(id),
            Some(RelatedEntity::Comment(id)) => self.related_comment = Some(id),
            Some(RelatedEntity::Tweet(id)) => self.related_tweet = Some(id),
            Some(RelatedEntity::Channel(id)) => self.related_channel = Some(id),
            None => {}
        }
    }

    pub fn related_entity(&self) -> Option<RelatedEntity> {
        if let Some(id) = &self.related_video {
            return Some(RelatedEntity::Video(id.clone()));
        }
        if let Some(id) = &self.related_comment {
            return Some(RelatedEntity::Comment(id.clone()));
        }
        if let Some(id) = &self.related_tweet {
            return Some(RelatedEntity::Tweet(id.clone()));
        }
        if let Some(id) = &self.related_channel {
            return Some(RelatedEntity::Channel(id.clone()));
        }
        None
    }
}

/// 创建通知的请求体。HTTP 边界仍然接受四个可选字段，
/// 转换成 `RelatedEntity` 时多于一个即校验失败。
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateNotificationRequest {
    pub recipient_id: String,
    pub sender_id: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 500))]
    pub message: String,
    pub related_video: Option<String>,
    pub related_comment: Option<String>,
    pub related_tweet: Option<String>,
    pub related_channel: Option<String>,
    #[validate(length(max = 2000))]
    pub action_url: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateNotificationRequest {
    /// 四个关联字段至多允许一个非空
    pub fn related_entity(&self) -> Result<Option<RelatedEntity>> {
        let mut related = Vec::new();
        if let Some(id) = &self.related_video {
            related.push(RelatedEntity::Video(id.clone()));
        }
        if let Some(id) = &self.related_comment {
            related.push(RelatedEntity::Comment(id.clone()));
        }
        if let Some(id) = &self.related_tweet {
            related.push(RelatedEntity::Tweet(id.clone()));
        }
        if let Some(id) = &self.related_channel {
            related.push(RelatedEntity::Channel(id.clone()));
        }

        if related.len() > 1 {
            return Err(AppError::Validation(
                "At most one related entity may be set".to_string(),
            ));
        }

        Ok(related.into_iter().next())
    }
}

/// 发送者的公开投影，随通知列表一并返回
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderInfo {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationWithSender {
    #[serde(flatten)]
    pub notification: Notification,
    pub sender: Option<SenderInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkReadRequest {
    pub notification_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteNotificationsRequest {
    pub notification_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreateNotificationRequest {
        CreateNotificationRequest {
            recipient_id: "user-a".to_string(),
            sender_id: Some("user-b".to_string()),
            notification_type: NotificationType::VideoComment,
            title: "New comment".to_string(),
            message: "Someone commented on your video".to_string(),
            related_video: None,
            related_comment: None,
            related_tweet: None,
            related_channel: None,
            action_url: None,
            context: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_related_entity_none() {
        let request = base_request();
        assert_eq!(request.related_entity().unwrap(), None);
    }

    #[test]
    fn test_related_entity_single() {
        let mut request = base_request();
        request.related_video = Some("vid-1".to_string());
        assert_eq!(
            request.related_entity().unwrap(),
            Some(RelatedEntity::Video("vid-1".to_string()))
        );
    }

    #[test]
    fn test_related_entity_multiple_rejected() {
        let mut request = base_request();
        request.related_video = Some("vid-1".to_string());
        request.related_comment = Some("com-1".to_string());
        assert!(request.related_entity().is_err());

        request.related_comment = None;
        request.related_channel = Some("chan-1".to_string());
        assert!(request.related_entity().is_err());
    }

    #[test]
    fn test_set_related_entity_clears_other_columns() {
        let mut n = Notification {
            id: "n1".to_string(),
            recipient_id: "user-a".to_string(),
            sender_id: None,
            notification_type: NotificationType::System,
            title: "t".to_string(),
            message: "m".to_string(),
            is_read: false,
            related_video: Some("old".to_string()),
            related_comment: None,
            related_tweet: None,
            related_channel: None,
            action_url: None,
            context: HashMap::new(),
            expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        n.set_related_entity(Some(RelatedEntity::Comment("c1".to_string())));
        assert_eq!(n.related_video, None);
        assert_eq!(n.related_comment, Some("c1".to_string()));
        assert_eq!(
            n.related_entity(),
            Some(RelatedEntity::Comment("c1".to_string()))
        );
    }

    #[test]
    fn test_notification_type_wire_format() {
        let encoded = serde_json::to_string(&NotificationType::VideoUploadSuccess).unwrap();
        assert_eq!(encoded, "\"video_upload_success\"");
        let decoded: NotificationType = serde_json::from_str("\"comment_reply\"").unwrap();
        assert_eq!(decoded, NotificationType::CommentReply);
    }
}
