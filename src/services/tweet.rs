use crate::{
    error::{AppError, Result},
    models::{notification::DeletedContentKind, tweet::*},
    services::{database::PaginatedResult, Database, NotificationService},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct TweetService {
    db: Arc<Database>,
    notification_service: NotificationService,
}

impl TweetService {
    pub async fn new(db: Arc<Database>, notification_service: NotificationService) -> Result<Self> {
        Ok(Self {
            db,
            notification_service,
        })
    }

    pub async fn create_tweet(&self, user_id: &str, request: CreateTweetRequest) -> Result<Tweet> {
        request.validate().map_err(AppError::ValidatorError)?;

        let now = Utc::now();
        let tweet = Tweet {
            id: Uuid::new_v4().to_string(),
            owner_id: user_id.to_string(),
            content: request.content,
            like_count: 0,
            created_at: now,
            updated_at: now,
        };

        self.db.create("tweet", &tweet).await?;
        Ok(tweet)
    }

    pub async fn get_tweet(&self, tweet_id: &str) -> Result<Option<Tweet>> {
        self.db.get_by_id("tweet", tweet_id).await
    }

    pub async fn get_channel_tweets(
        &self,
        owner_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<PaginatedResult<Tweet>> {
        let page = page.max(1);
        let limit = limit.clamp(1, self.db.config.max_page_size);
        let offset = (page - 1) * limit;

        let mut response = self
            .db
            .query_with_params(
                "SELECT count() AS count FROM tweet WHERE owner_id = $owner_id GROUP ALL",
                json!({ "owner_id": owner_id }),
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
                    SELECT *, meta::id(id) AS id FROM tweet
                    WHERE owner_id = $owner_id
                    ORDER BY created_at DESC
                    LIMIT $limit START $offset
                "#,
                json!({ "owner_id": owner_id, "limit": limit, "offset": offset }),
            )
            .await?;
        let tweets: Vec<Tweet> = response.take(0)?;

        Ok(PaginatedResult::new(tweets, total, page, limit))
    }

    pub async fn update_tweet(
        &self,
        tweet_id: &str,
        user_id: &str,
        request: UpdateTweetRequest,
    ) -> Result<Tweet> {
        request.validate().map_err(AppError::ValidatorError)?;

        let tweet = self.owned_tweet(tweet_id, user_id).await?;

        self.db
            .update_by_id_with_json(
                "tweet",
                &tweet.id,
                json!({ "content": request.content, "updated_at": Utc::now() }),
            )
            .await?
            .ok_or_else(|| AppError::internal("Failed to update tweet"))
    }

    pub async fn delete_tweet(&self, tweet_id: &str, user_id: &str) -> Result<()> {
        let tweet = self.owned_tweet(tweet_id, user_id).await?;

        self.db.delete_by_id("tweet", &tweet.id).await?;
        self.db
            .query_with_params(
                "DELETE like WHERE target_kind = 'tweet' AND target_id = $tweet_id",
                json!({ "tweet_id": tweet.id }),
            )
            .await?;

        if let Err(e) = self
            .notification_service
            .notify_content_deletion(user_id, DeletedContentKind::Tweet, &tweet.content)
            .await
        {
            warn!("Failed to send deletion notification for tweet {}: {}", tweet.id, e);
        }

        Ok(())
    }

    async fn owned_tweet(&self, tweet_id: &str, user_id: &str) -> Result<Tweet> {
        let tweet: Tweet = self
            .db
            .get_by_id("tweet", tweet_id)
            .await?
            .ok_or_else(|| AppError::not_found("Tweet"))?;

        if tweet.owner_id != user_id {
            return Err(AppError::forbidden("You can only modify your own posts"));
        }

        Ok(tweet)
    }
}
