use crate::{
    error::{AppError, Result},
    models::{like::LikeTargetKind, tweet::*},
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_tweet))
        .route("/:id", get(get_tweet))
        .route("/:id", put(update_tweet))
        .route("/:id", delete(delete_tweet))
        .route("/:id/like", post(toggle_like))
        .route("/channel/:user_id", get(get_channel_tweets))
}

#[derive(Debug, Deserialize)]
pub struct TweetListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

async fn create_tweet(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<CreateTweetRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let tweet = state.tweet_service.create_tweet(&user.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": tweet
    })))
}

async fn get_tweet(
    State(state): State<Arc<AppState>>,
    Path(tweet_id): Path<String>,
) -> Result<Json<Value>> {
    let tweet = state
        .tweet_service
        .get_tweet(&tweet_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tweet"))?;

    Ok(Json(json!({
        "success": true,
        "data": tweet
    })))
}

async fn get_channel_tweets(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<TweetListQuery>,
) -> Result<Json<Value>> {
    let (page, limit) = state.page_params(query.page, query.limit);
    let tweets = state
        .tweet_service
        .get_channel_tweets(&user_id, page, limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": tweets
    })))
}

async fn update_tweet(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(tweet_id): Path<String>,
    Json(request): Json<UpdateTweetRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let tweet = state
        .tweet_service
        .update_tweet(&tweet_id, &user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": tweet
    })))
}

async fn delete_tweet(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(tweet_id): Path<String>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    state.tweet_service.delete_tweet(&tweet_id, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Post deleted successfully"
    })))
}

async fn toggle_like(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(tweet_id): Path<String>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let result = state
        .like_service
        .toggle_like(&user.id, LikeTargetKind::Tweet, &tweet_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}
