/// Post reactions
///
/// One reaction per user per post, enforced by UNIQUE(post_id, user_id).
/// Re-submitting the same type removes the reaction; submitting the other
/// type switches it in place.
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Reaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    Like,
    Dislike,
}

impl ReactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionType::Like => "like",
            ReactionType::Dislike => "dislike",
        }
    }

    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s.to_lowercase().as_str() {
            "like" => Ok(ReactionType::Like),
            "dislike" => Ok(ReactionType::Dislike),
            _ => Err(ApiError::Validation(format!("Invalid reaction type: {}", s))),
        }
    }
}

/// Result of a reaction submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Removed,
    Switched,
}

/// Aggregate reaction counts for a post, with the caller's own reaction
#[derive(Debug, Clone, Serialize)]
pub struct ReactionStats {
    pub post_id: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub my_reaction: Option<ReactionType>,
}

/// Reaction manager service
pub struct ReactionManager {
    db: SqlitePool,
}

impl ReactionManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Submit a reaction with toggle semantics.
    ///
    /// The read and the write run in one transaction, and a unique
    /// violation on insert is folded back into the toggle: a submission
    /// that loses the insert race acts on the row that beat it instead of
    /// surfacing a storage error.
    pub async fn react(
        &self,
        post_id: i64,
        user_id: i64,
        reaction: ReactionType,
    ) -> ApiResult<ReactionAction> {
        self.ensure_post_exists(post_id).await?;

        let mut tx = self.db.begin().await.map_err(ApiError::Database)?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT type FROM reactions WHERE post_id = ?1 AND user_id = ?2",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(ApiError::Database)?;

        let action = Self::apply_reaction(&mut tx, post_id, user_id, reaction, existing).await?;

        tx.commit().await.map_err(ApiError::Database)?;

        Ok(action)
    }

    async fn apply_reaction(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        post_id: i64,
        user_id: i64,
        reaction: ReactionType,
        existing: Option<String>,
    ) -> ApiResult<ReactionAction> {
        match existing {
            None => {
                let inserted = sqlx::query(
                    "INSERT INTO reactions (post_id, user_id, type, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(post_id)
                .bind(user_id)
                .bind(reaction.as_str())
                .bind(Utc::now())
                .execute(&mut **tx)
                .await;

                match inserted {
                    Ok(_) => Ok(ReactionAction::Added),
                    Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                        // Lost the insert race; toggle against the row that
                        // landed first
                        let current: String = sqlx::query_scalar(
                            "SELECT type FROM reactions WHERE post_id = ?1 AND user_id = ?2",
                        )
                        .bind(post_id)
                        .bind(user_id)
                        .fetch_one(&mut **tx)
                        .await
                        .map_err(ApiError::Database)?;

                        Self::toggle_existing(tx, post_id, user_id, reaction, &current).await
                    }
                    Err(e) => Err(ApiError::Database(e)),
                }
            }
            Some(current) => Self::toggle_existing(tx, post_id, user_id, reaction, &current).await,
        }
    }

    async fn toggle_existing(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        post_id: i64,
        user_id: i64,
        reaction: ReactionType,
        current: &str,
    ) -> ApiResult<ReactionAction> {
        if current == reaction.as_str() {
            sqlx::query("DELETE FROM reactions WHERE post_id = ?1 AND user_id = ?2")
                .bind(post_id)
                .bind(user_id)
                .execute(&mut **tx)
                .await
                .map_err(ApiError::Database)?;

            Ok(ReactionAction::Removed)
        } else {
            sqlx::query(
                "UPDATE reactions SET type = ?1, created_at = ?2
                 WHERE post_id = ?3 AND user_id = ?4",
            )
            .bind(reaction.as_str())
            .bind(Utc::now())
            .bind(post_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(ApiError::Database)?;

            Ok(ReactionAction::Switched)
        }
    }

    /// Remove the caller's reaction
    pub async fn remove(&self, post_id: i64, user_id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM reactions WHERE post_id = ?1 AND user_id = ?2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Reaction not found".to_string()));
        }

        Ok(())
    }

    /// Reaction counts for a post, with the caller's own reaction when
    /// an identity is supplied
    pub async fn stats(&self, post_id: i64, user_id: Option<i64>) -> ApiResult<ReactionStats> {
        self.ensure_post_exists(post_id).await?;

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(CASE WHEN type = 'like' THEN 1 END) AS likes,
                COUNT(CASE WHEN type = 'dislike' THEN 1 END) AS dislikes
            FROM reactions WHERE post_id = ?1
            "#,
        )
        .bind(post_id)
        .fetch_one(&self.db)
        .await
        .map_err(ApiError::Database)?;

        let my_reaction = match user_id {
            Some(user_id) => self.reaction_of(post_id, user_id).await?,
            None => None,
        };

        Ok(ReactionStats {
            post_id,
            likes: row.try_get("likes")?,
            dislikes: row.try_get("dislikes")?,
            my_reaction,
        })
    }

    /// The caller's reaction to a post, if any
    pub async fn reaction_of(
        &self,
        post_id: i64,
        user_id: i64,
    ) -> ApiResult<Option<ReactionType>> {
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT type FROM reactions WHERE post_id = ?1 AND user_id = ?2",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        existing.map(|s| ReactionType::from_str(&s)).transpose()
    }

    async fn ensure_post_exists(&self, post_id: i64) -> ApiResult<()> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = ?1")
            .bind(post_id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

        if count == 0 {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }

        Ok(())
    }
}
