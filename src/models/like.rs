use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 点赞目标的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeTargetKind {
    Video,
    Comment,
    Tweet,
}

impl LikeTargetKind {
    /// 点赞计数所在的表名
    pub fn table(&self) -> &'static str {
        match self {
            LikeTargetKind::Video => "video",
            LikeTargetKind::Comment => "comment",
            LikeTargetKind::Tweet => "tweet",
        }
    }
}

/// 每个 (user, target) 至多一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: String,
    pub user_id: String,
    pub target_kind: LikeTargetKind,
    pub target_id: String,
    pub created_at: DateTime<Utc>,
}

/// toggle 操作的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeToggleResult {
    pub liked: bool,
    pub like_count: i64,
}
