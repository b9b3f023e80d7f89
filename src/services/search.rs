use crate::{
    error::{AppError, Result},
    models::video::Video,
    services::{database::PaginatedResult, Database},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct SearchService {
    db: Arc<Database>,
}

impl SearchService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 在已发布视频的标题和描述里做关键字搜索，最新在前
    pub async fn search_videos(
        &self,
        query: &str,
        page: usize,
        limit: usize,
    ) -> Result<PaginatedResult<Video>> {
        let query = query.trim();
        if query.chars().count() < self.db.config.search_min_length {
            return Err(AppError::bad_request("Search query is too short"));
        }

        debug!("Searching videos for: {}", query);

        let page = page.max(1);
        let limit = limit
            .clamp(1, self.db.config.max_page_size)
            .min(self.db.config.search_max_results);
        let offset = (page - 1) * limit;
        let needle = query.to_lowercase();

        let mut response = self
            .db
            .query_with_params(
                r#"
                    SELECT count() AS count FROM video
                    WHERE is_published = true
                    AND (string::lowercase(title) CONTAINS $needle
                        OR string::lowercase(description ?? '') CONTAINS $needle)
                    GROUP ALL
                "#,
                json!({ "needle": needle }),
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
                    SELECT *, meta::id(id) AS id FROM video
                    WHERE is_published = true
                    AND (string::lowercase(title) CONTAINS $needle
                        OR string::lowercase(description ?? '') CONTAINS $needle)
                    ORDER BY created_at DESC
                    LIMIT $limit START $offset
                "#,
                json!({ "needle": needle, "limit": limit, "offset": offset }),
            )
            .await?;
        let videos: Vec<Video> = response.take(0)?;

        Ok(PaginatedResult::new(videos, total, page, limit))
    }
}
