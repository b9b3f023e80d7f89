use crate::{
    error::{AppError, Result},
    models::{
        response::ApiResponse,
        watch_history::{RecordProgressRequest, WatchPreference, WatchProgress},
    },
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
        .route("/", get(list_history))
        .route("/", delete(clear_history))
        .route("/stats", get(get_stats))
        .route("/pause", post(pause_history))
        .route("/resume", post(resume_history))
        .route("/videos/:video_id", delete(remove_video))
        .route("/videos/:video_id/progress", post(record_progress))
}

#[derive(Debug, Deserialize)]
pub struct HistoryListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// 上报观看进度。历史已暂停时丢弃本次上报。
/// POST /api/v1/history/videos/:video_id/progress
async fn record_progress(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(video_id): Path<String>,
    Json(request): Json<RecordProgressRequest>,
) -> Result<Json<ApiResponse<Option<WatchProgress>>>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    if state.watch_history_service.is_history_paused(&user.id).await? {
        return Ok(Json(ApiResponse::success_with_message(
            None,
            "Watch history is paused",
        )));
    }

    let record = state
        .watch_history_service
        .record_progress(&user.id, &video_id, request)
        .await?;

    Ok(Json(ApiResponse::success(Some(record))))
}

async fn list_history(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<HistoryListQuery>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let (page, limit) = state.page_params(query.page, query.limit);
    let history = state
        .watch_history_service
        .get_history(&user.id, page, limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": history
    })))
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let stats = state.watch_history_service.get_user_stats(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": stats
    })))
}

async fn clear_history(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let removed = state.watch_history_service.clear_history(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "removed": removed }
    })))
}

async fn remove_video(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(video_id): Path<String>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    state
        .watch_history_service
        .remove_video(&user.id, &video_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Video removed from watch history"
    })))
}

async fn pause_history(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<ApiResponse<WatchPreference>>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let preference = state.watch_history_service.pause_history(&user.id).await?;

    Ok(Json(ApiResponse::success(preference)))
}

async fn resume_history(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<ApiResponse<WatchPreference>>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let preference = state.watch_history_service.resume_history(&user.id).await?;

    Ok(Json(ApiResponse::success(preference)))
}
