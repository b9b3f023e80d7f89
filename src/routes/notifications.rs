use crate::{
    error::{AppError, Result},
    models::notification::*,
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/", delete(delete_notifications))
        .route("/unread-count", get(unread_count))
        .route("/mark-read", post(mark_read))
        .route("/mark-all-read", post(mark_all_read))
        .route("/all", delete(delete_all))
}

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub unread_only: Option<bool>,
}

/// 分页获取当前用户的通知
/// GET /api/v1/notifications
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let (page, limit) = state.page_params(query.page, query.limit);
    let notifications = state
        .notification_service
        .get_user_notifications(&user.id, page, limit, query.unread_only.unwrap_or(false))
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": notifications
    })))
}

/// 未读数角标。查询失败时返回 0 而不是错误。
/// GET /api/v1/notifications/unread-count
async fn unread_count(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let count = state.notification_service.get_unread_count(&user.id).await;

    Ok(Json(json!({
        "success": true,
        "data": { "unread_count": count }
    })))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<MarkReadRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let affected = state
        .notification_service
        .mark_notifications_as_read(&request.notification_ids, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "affected": affected }
    })))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let affected = state
        .notification_service
        .mark_all_as_read(&user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "affected": affected }
    })))
}

async fn delete_notifications(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<DeleteNotificationsRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let affected = state
        .notification_service
        .delete_notifications(&request.notification_ids, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "affected": affected }
    })))
}

async fn delete_all(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let affected = state.notification_service.delete_all(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "affected": affected }
    })))
}
