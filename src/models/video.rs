use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    /// 外部媒体主机上的播放地址
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    /// 时长，秒
    pub duration: f64,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoWithOwner {
    #[serde(flatten)]
    pub video: Video,
    pub owner_username: String,
    pub owner_display_name: String,
    pub owner_avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateVideoRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(url)]
    pub video_url: String,

    #[validate(url)]
    pub thumbnail_url: Option<String>,

    #[validate(range(min = 0.0))]
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateVideoRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(url)]
    pub thumbnail_url: Option<String>,
}
