use crate::{
    error::{AppError, Result},
    models::subscription::*,
    services::{database::PaginatedResult, Database, NotificationService},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct SubscriptionService {
    db: Arc<Database>,
    notification_service: NotificationService,
}

impl SubscriptionService {
    pub async fn new(db: Arc<Database>, notification_service: NotificationService) -> Result<Self> {
        Ok(Self {
            db,
            notification_service,
        })
    }

    /// 订阅频道，并通知频道主（尽力而为）
    pub async fn subscribe(&self, subscriber_id: &str, channel_user_id: &str) -> Result<()> {
        debug!("User {} subscribing to channel {}", subscriber_id, channel_user_id);

        // 不允许订阅自己
        if subscriber_id == channel_user_id {
            return Err(AppError::bad_request("Cannot subscribe to yourself"));
        }

        let mut response = self
            .db
            .query_with_params(
                "SELECT user_id FROM channel_profile WHERE user_id = $user_id LIMIT 1",
                json!({ "user_id": channel_user_id }),
            )
            .await?;
        let channels: Vec<Value> = response.take(0)?;
        if channels.is_empty() {
            return Err(AppError::not_found("Channel"));
        }

        if self.is_subscribed(subscriber_id, channel_user_id).await? {
            return Err(AppError::conflict("Already subscribed to this channel"));
        }

        let subscription = Subscription {
            id: Uuid::new_v4().to_string(),
            subscriber_id: subscriber_id.to_string(),
            channel_id: channel_user_id.to_string(),
            created_at: Utc::now(),
        };
        self.db.create("subscription", &subscription).await?;

        self.update_subscriber_count(channel_user_id).await?;

        if let Err(e) = self
            .notification_service
            .notify_new_subscription(subscriber_id, channel_user_id)
            .await
        {
            warn!("Failed to send subscription notification: {}", e);
        }

        info!("User {} subscribed to channel {}", subscriber_id, channel_user_id);
        Ok(())
    }

    pub async fn unsubscribe(&self, subscriber_id: &str, channel_user_id: &str) -> Result<()> {
        self.db
            .query_with_params(
                r#"
                    DELETE subscription
                    WHERE subscriber_id = $subscriber_id AND channel_id = $channel_id
                "#,
                json!({ "subscriber_id": subscriber_id, "channel_id": channel_user_id }),
            )
            .await?
            .check()?;

        self.update_subscriber_count(channel_user_id).await?;
        Ok(())
    }

    pub async fn is_subscribed(&self, subscriber_id: &str, channel_user_id: &str) -> Result<bool> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                    SELECT count() AS count FROM subscription
                    WHERE subscriber_id = $subscriber_id AND channel_id = $channel_id
                    GROUP ALL
                "#,
                json!({ "subscriber_id": subscriber_id, "channel_id": channel_user_id }),
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

    /// 用户订阅的频道列表
    pub async fn get_subscriptions(
        &self,
        subscriber_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<PaginatedResult<SubscribedChannelInfo>> {
        self.channel_page(
            "SELECT count() AS count FROM subscription WHERE subscriber_id = $user_id GROUP ALL",
            r#"
                SELECT channel_id FROM subscription
                WHERE subscriber_id = $user_id
                ORDER BY created_at DESC
                LIMIT $limit START $offset
            "#,
            "channel_id",
            subscriber_id,
            page,
            limit,
        )
        .await
    }

    /// 频道的订阅者列表
    pub async fn get_subscribers(
        &self,
        channel_user_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<PaginatedResult<SubscribedChannelInfo>> {
        self.channel_page(
            "SELECT count() AS count FROM subscription WHERE channel_id = $user_id GROUP ALL",
            r#"
                SELECT subscriber_id FROM subscription
                WHERE channel_id = $user_id
                ORDER BY created_at DESC
                LIMIT $limit START $offset
            "#,
            "subscriber_id",
            channel_user_id,
            page,
            limit,
        )
        .await
    }

    async fn channel_page(
        &self,
        count_query: &str,
        list_query: &str,
        id_field: &str,
        user_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<PaginatedResult<SubscribedChannelInfo>> {
        let page = page.max(1);
        let limit = limit.clamp(1, self.db.config.max_page_size);
        let offset = (page - 1) * limit;

        let mut response = self
            .db
            .query_with_params(count_query, json!({ "user_id": user_id }))
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
                list_query,
                json!({ "user_id": user_id, "limit": limit, "offset": offset }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        let ids: Vec<String> = rows
            .iter()
            .filter_map(|r| r.get(id_field).and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .collect();

        let mut data = Vec::with_capacity(ids.len());
        if !ids.is_empty() {
            let mut response = self
                .db
                .query_with_params(
                    r#"
                        SELECT user_id, username, display_name, avatar_url, subscriber_count
                        FROM channel_profile
                        WHERE user_id IN $ids
                    "#,
                    json!({ "ids": ids }),
                )
                .await?;
            let profiles: Vec<SubscribedChannelInfo> = response.take(0)?;

            // 保持订阅时间排序
            for id in &ids {
                if let Some(profile) = profiles.iter().find(|p| &p.user_id == id) {
                    data.push(profile.clone());
                }
            }
        }

        Ok(PaginatedResult::new(data, total, page, limit))
    }

    async fn update_subscriber_count(&self, channel_user_id: &str) -> Result<()> {
        self.db
            .query_with_params(
                r#"
                    LET $count = (SELECT count() AS count FROM subscription WHERE channel_id = $user_id GROUP ALL)[0].count ?? 0;
                    UPDATE channel_profile SET subscriber_count = $count WHERE user_id = $user_id;
                "#,
                json!({ "user_id": channel_user_id }),
            )
            .await?;
        Ok(())
    }
}
