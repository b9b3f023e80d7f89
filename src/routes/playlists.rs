use crate::{
    error::{AppError, Result},
    models::playlist::*,
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
        .route("/", post(create_playlist))
        .route("/:id", get(get_playlist))
        .route("/:id", put(update_playlist))
        .route("/:id", delete(delete_playlist))
        .route("/:id/videos/:video_id", post(add_video))
        .route("/:id/videos/:video_id", delete(remove_video))
        .route("/user/:user_id", get(get_user_playlists))
}

#[derive(Debug, Deserialize)]
pub struct PlaylistListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

async fn create_playlist(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<CreatePlaylistRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let playlist = state
        .playlist_service
        .create_playlist(&user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": playlist
    })))
}

async fn get_playlist(
    State(state): State<Arc<AppState>>,
    Path(playlist_id): Path<String>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let viewer_id = user.as_ref().map(|u| u.id.as_str());
    let playlist = state
        .playlist_service
        .get_playlist(&playlist_id, viewer_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": playlist
    })))
}

async fn get_user_playlists(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<PlaylistListQuery>,
) -> Result<Json<Value>> {
    let (page, limit) = state.page_params(query.page, query.limit);
    let include_private = user.as_ref().map(|u| u.id == user_id).unwrap_or(false);

    let playlists = state
        .playlist_service
        .get_user_playlists(&user_id, include_private, page, limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": playlists
    })))
}

async fn update_playlist(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(playlist_id): Path<String>,
    Json(request): Json<UpdatePlaylistRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let playlist = state
        .playlist_service
        .update_playlist(&playlist_id, &user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": playlist
    })))
}

async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(playlist_id): Path<String>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    state
        .playlist_service
        .delete_playlist(&playlist_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Playlist deleted successfully"
    })))
}

async fn add_video(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let playlist = state
        .playlist_service
        .add_video(&playlist_id, &user.id, &video_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": playlist
    })))
}

async fn remove_video(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let playlist = state
        .playlist_service
        .remove_video(&playlist_id, &user.id, &video_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": playlist
    })))
}
