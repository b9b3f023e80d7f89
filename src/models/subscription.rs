use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 订阅关系：subscriber 关注 channel，(subscriber, channel) 唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub subscriber_id: String,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
}

/// 订阅列表里返回的频道投影
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribedChannelInfo {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub subscriber_count: i64,
}
