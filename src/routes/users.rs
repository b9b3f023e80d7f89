use crate::{
    error::{AppError, Result},
    models::user::UpdateChannelProfileRequest,
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(get_current_profile))
        .route("/me", put(update_current_profile))
        .route("/me/stats", get(get_channel_stats))
        .route("/:username", get(get_profile))
}

/// 当前用户的频道资料
/// GET /api/v1/users/me
async fn get_current_profile(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let profile = state
        .user_service
        .get_profile_by_user_id(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Channel profile"))?;

    Ok(Json(json!({
        "success": true,
        "data": profile
    })))
}

async fn update_current_profile(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<UpdateChannelProfileRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let profile = state.user_service.update_profile(&user.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": profile
    })))
}

async fn get_channel_stats(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let stats = state.user_service.get_channel_stats(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": stats
    })))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Value>> {
    let profile = state
        .user_service
        .get_profile_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found("Channel"))?;

    Ok(Json(json!({
        "success": true,
        "data": profile
    })))
}
