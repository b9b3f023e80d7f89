use crate::{error::Result, state::AppState};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/videos", get(search_videos))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// 关键字搜索已发布视频
/// GET /api/v1/search/videos?q=...
async fn search_videos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>> {
    let (page, limit) = state.page_params(query.page, query.limit);
    let results = state
        .search_service
        .search_videos(&query.q, page, limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": results
    })))
}
