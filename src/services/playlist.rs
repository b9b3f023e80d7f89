use crate::{
    error::{AppError, Result},
    models::{playlist::*, video::Video},
    services::{database::PaginatedResult, Database},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct PlaylistService {
    db: Arc<Database>,
}

impl PlaylistService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    pub async fn create_playlist(
        &self,
        user_id: &str,
        request: CreatePlaylistRequest,
    ) -> Result<Playlist> {
        request.validate().map_err(AppError::ValidatorError)?;

        let now = Utc::now();
        let playlist = Playlist {
            id: Uuid::new_v4().to_string(),
            owner_id: user_id.to_string(),
            name: request.name,
            description: request.description,
            video_ids: Vec::new(),
            is_public: request.is_public.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        self.db.create("playlist", &playlist).await?;
        Ok(playlist)
    }

    /// 获取播放列表；私有列表只有所有者可见
    pub async fn get_playlist(
        &self,
        playlist_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<Playlist> {
        let playlist: Playlist = self
            .db
            .get_by_id("playlist", playlist_id)
            .await?
            .ok_or_else(|| AppError::not_found("Playlist"))?;

        if !playlist.is_public && viewer_id != Some(playlist.owner_id.as_str()) {
            return Err(AppError::not_found("Playlist"));
        }

        Ok(playlist)
    }

    pub async fn get_user_playlists(
        &self,
        owner_id: &str,
        include_private: bool,
        page: usize,
        limit: usize,
    ) -> Result<PaginatedResult<Playlist>> {
        let page = page.max(1);
        let limit = limit.clamp(1, self.db.config.max_page_size);
        let offset = (page - 1) * limit;

        let public_clause = if include_private { "" } else { "AND is_public = true" };

        let count_query = format!(
            "SELECT count() AS count FROM playlist WHERE owner_id = $owner_id {} GROUP ALL",
            public_clause
        );
        let mut response = self
            .db
            .query_with_params(&count_query, json!({ "owner_id": owner_id }))
            .await?;
        let count_rows: Vec<Value> = response.take(0)?;
        let total = count_rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0) as usize;

        let list_query = format!(
            r#"
                SELECT *, meta::id(id) AS id FROM playlist
                WHERE owner_id = $owner_id {}
                ORDER BY created_at DESC
                LIMIT $limit START $offset
            "#,
            public_clause
        );
        let mut response = self
            .db
            .query_with_params(
                &list_query,
                json!({ "owner_id": owner_id, "limit": limit, "offset": offset }),
            )
            .await?;
        let playlists: Vec<Playlist> = response.take(0)?;

        Ok(PaginatedResult::new(playlists, total, page, limit))
    }

    pub async fn update_playlist(
        &self,
        playlist_id: &str,
        user_id: &str,
        request: UpdatePlaylistRequest,
    ) -> Result<Playlist> {
        request.validate().map_err(AppError::ValidatorError)?;

        let playlist = self.owned_playlist(playlist_id, user_id).await?;

        let mut updates = json!({ "updated_at": Utc::now() });
        if let Some(name) = &request.name {
            updates["name"] = json!(name);
        }
        if let Some(description) = &request.description {
            updates["description"] = json!(description);
        }
        if let Some(is_public) = request.is_public {
            updates["is_public"] = json!(is_public);
        }

        self.db
            .update_by_id_with_json("playlist", &playlist.id, updates)
            .await?
            .ok_or_else(|| AppError::internal("Failed to update playlist"))
    }

    pub async fn delete_playlist(&self, playlist_id: &str, user_id: &str) -> Result<()> {
        let playlist = self.owned_playlist(playlist_id, user_id).await?;
        self.db.delete_by_id("playlist", &playlist.id).await
    }

    /// 往列表里加视频；重复添加是无操作
    pub async fn add_video(
        &self,
        playlist_id: &str,
        user_id: &str,
        video_id: &str,
    ) -> Result<Playlist> {
        let mut playlist = self.owned_playlist(playlist_id, user_id).await?;

        let video: Option<Video> = self.db.get_by_id("video", video_id).await?;
        if video.is_none() {
            return Err(AppError::not_found("Video"));
        }

        if playlist.video_ids.iter().any(|id| id == video_id) {
            return Ok(playlist);
        }

        playlist.video_ids.push(video_id.to_string());
        self.save_video_ids(&playlist).await?;
        Ok(playlist)
    }

    /// 从列表里移除视频；不在列表中是无操作
    pub async fn remove_video(
        &self,
        playlist_id: &str,
        user_id: &str,
        video_id: &str,
    ) -> Result<Playlist> {
        let mut playlist = self.owned_playlist(playlist_id, user_id).await?;

        let before = playlist.video_ids.len();
        playlist.video_ids.retain(|id| id != video_id);
        if playlist.video_ids.len() == before {
            return Ok(playlist);
        }

        self.save_video_ids(&playlist).await?;
        Ok(playlist)
    }

    async fn save_video_ids(&self, playlist: &Playlist) -> Result<()> {
        self.db
            .update_by_id_with_json::<Playlist>(
                "playlist",
                &playlist.id,
                json!({ "video_ids": playlist.video_ids, "updated_at": Utc::now() }),
            )
            .await?;
        Ok(())
    }

    async fn owned_playlist(&self, playlist_id: &str, user_id: &str) -> Result<Playlist> {
        let playlist: Playlist = self
            .db
            .get_by_id("playlist", playlist_id)
            .await?
            .ok_or_else(|| AppError::not_found("Playlist"))?;

        if playlist.owner_id != user_id {
            return Err(AppError::forbidden("You can only modify your own playlists"));
        }

        Ok(playlist)
    }
}
