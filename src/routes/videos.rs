use crate::{
    error::{AppError, Result},
    models::{like::LikeTargetKind, video::*},
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
        .route("/", post(create_video))
        .route("/:id", get(get_video))
        .route("/:id", put(update_video))
        .route("/:id", delete(delete_video))
        .route("/:id/publish", post(toggle_publish))
        .route("/:id/like", post(toggle_like))
        .route("/channel/:user_id", get(get_channel_videos))
}

#[derive(Debug, Deserialize)]
pub struct VideoListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

async fn create_video(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<CreateVideoRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let video = state.video_service.create_video(&user.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": video
    })))
}

async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let viewer_id = user.as_ref().map(|u| u.id.as_str());
    let video = state.video_service.get_video(&video_id, viewer_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": video
    })))
}

async fn get_channel_videos(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<VideoListQuery>,
) -> Result<Json<Value>> {
    let (page, limit) = state.page_params(query.page, query.limit);
    // 频道主可以看到自己未发布的视频
    let include_unpublished = user.as_ref().map(|u| u.id == user_id).unwrap_or(false);

    let videos = state
        .video_service
        .get_channel_videos(&user_id, include_unpublished, page, limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": videos
    })))
}

async fn update_video(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(video_id): Path<String>,
    Json(request): Json<UpdateVideoRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let video = state
        .video_service
        .update_video(&video_id, &user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": video
    })))
}

async fn toggle_publish(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(video_id): Path<String>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let video = state
        .video_service
        .toggle_publish(&video_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": video
    })))
}

async fn delete_video(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(video_id): Path<String>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    state.video_service.delete_video(&video_id, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Video deleted successfully"
    })))
}

async fn toggle_like(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(video_id): Path<String>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let result = state
        .like_service
        .toggle_like(&user.id, LikeTargetKind::Video, &video_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}
