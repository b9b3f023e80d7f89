use crate::{
    error::{AppError, Result},
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(my_subscriptions))
        .route("/:channel_user_id", post(subscribe))
        .route("/:channel_user_id", delete(unsubscribe))
        .route("/:channel_user_id/status", get(subscription_status))
        .route("/:channel_user_id/subscribers", get(channel_subscribers))
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

async fn subscribe(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(channel_user_id): Path<String>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    state
        .subscription_service
        .subscribe(&user.id, &channel_user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Subscribed successfully"
    })))
}

async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(channel_user_id): Path<String>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    state
        .subscription_service
        .unsubscribe(&user.id, &channel_user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Unsubscribed successfully"
    })))
}

async fn subscription_status(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(channel_user_id): Path<String>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let subscribed = state
        .subscription_service
        .is_subscribed(&user.id, &channel_user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "subscribed": subscribed }
    })))
}

async fn my_subscriptions(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<SubscriptionListQuery>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let (page, limit) = state.page_params(query.page, query.limit);
    let subscriptions = state
        .subscription_service
        .get_subscriptions(&user.id, page, limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": subscriptions
    })))
}

async fn channel_subscribers(
    State(state): State<Arc<AppState>>,
    Path(channel_user_id): Path<String>,
    Query(query): Query<SubscriptionListQuery>,
) -> Result<Json<Value>> {
    let (page, limit) = state.page_params(query.page, query.limit);
    let subscribers = state
        .subscription_service
        .get_subscribers(&channel_user_id, page, limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": subscribers
    })))
}
