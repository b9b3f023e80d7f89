use crate::{
    error::{AppError, Result},
    models::user::*,
    services::Database,
    utils::validation,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 确保频道资料存在；首次见到该用户时创建
    pub async fn ensure_profile(
        &self,
        user_id: &str,
        username: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<ChannelProfile> {
        if let Some(profile) = self.get_profile_by_user_id(user_id).await? {
            return Ok(profile);
        }

        let username = match username {
            Some(name) if validation::validate_username(name).is_ok() => name.to_string(),
            // 身份服务没有给出可用的用户名时生成一个
            _ => format!("user-{}", &Uuid::new_v4().to_string()[..8]),
        };

        let now = Utc::now();
        let profile = ChannelProfile {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            display_name: display_name.unwrap_or(&username).to_string(),
            username,
            description: None,
            avatar_url: None,
            cover_image_url: None,
            subscriber_count: 0,
            video_count: 0,
            created_at: now,
            updated_at: now,
        };

        self.db.create("channel_profile", &profile).await?;
        info!("Created channel profile for user {}", user_id);

        Ok(profile)
    }

    pub async fn get_profile_by_user_id(&self, user_id: &str) -> Result<Option<ChannelProfile>> {
        self.db.find_one("channel_profile", "user_id", user_id).await
    }

    pub async fn get_profile_by_username(&self, username: &str) -> Result<Option<ChannelProfile>> {
        self.db.find_one("channel_profile", "username", username).await
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateChannelProfileRequest,
    ) -> Result<ChannelProfile> {
        request.validate().map_err(AppError::ValidatorError)?;

        let profile = self
            .get_profile_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Channel profile"))?;

        let mut updates = json!({ "updated_at": Utc::now() });
        if let Some(display_name) = &request.display_name {
            validation::validate_display_name(display_name)?;
            updates["display_name"] = json!(display_name);
        }
        if let Some(description) = &request.description {
            updates["description"] = json!(description);
        }
        if let Some(avatar_url) = &request.avatar_url {
            updates["avatar_url"] = json!(avatar_url);
        }
        if let Some(cover_image_url) = &request.cover_image_url {
            updates["cover_image_url"] = json!(cover_image_url);
        }

        self.db
            .update_by_id_with_json("channel_profile", &profile.id, updates)
            .await?
            .ok_or_else(|| AppError::internal("Failed to update channel profile"))
    }

    /// 频道仪表板统计
    pub async fn get_channel_stats(&self, user_id: &str) -> Result<ChannelStats> {
        debug!("Getting channel stats for user: {}", user_id);

        let mut response = self.db.query_with_params(
            r#"
                SELECT
                    count() AS total_videos,
                    math::sum(view_count) AS total_views,
                    math::sum(like_count) AS total_likes
                FROM video
                WHERE owner_id = $user_id AND is_published = true
                GROUP ALL
            "#,
            json!({ "user_id": user_id }),
        ).await?;
        let rows: Vec<Value> = response.take(0)?;
        let stat = rows.first().cloned().unwrap_or(json!({}));

        let mut response = self.db.query_with_params(
            "SELECT count() AS count FROM subscription WHERE channel_id = $user_id GROUP ALL",
            json!({ "user_id": user_id }),
        ).await?;
        let sub_rows: Vec<Value> = response.take(0)?;
        let total_subscribers = sub_rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        Ok(ChannelStats {
            total_videos: stat.get("total_videos").and_then(|v| v.as_i64()).unwrap_or(0),
            total_views: stat.get("total_views").and_then(|v| v.as_i64()).unwrap_or(0),
            total_likes: stat.get("total_likes").and_then(|v| v.as_i64()).unwrap_or(0),
            total_subscribers,
        })
    }
}
