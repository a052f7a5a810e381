/// Post lookups
///
/// Posts are the subject of reports and reactions; routine post CRUD is
/// served elsewhere. This module only resolves a post and its owner.
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Post record
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Post store
pub struct PostStore {
    db: SqlitePool,
}

impl PostStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Get a post by id
    pub async fn get_post(&self, post_id: i64) -> ApiResult<Post> {
        let row = sqlx::query(
            "SELECT id, user_id, title, content, created_at FROM posts WHERE id = ?1",
        )
        .bind(post_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

        Ok(Post {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
