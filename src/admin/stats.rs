/// Dashboard statistics aggregation
use crate::error::{ApiError, ApiResult};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Reports pending above this count flag the dashboard for attention
const ATTENTION_PENDING_REPORTS: i64 = 20;

/// User totals and recent growth
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub admins: i64,
    pub new_today: i64,
    pub new_this_week: i64,
}

/// Post totals and recent activity
#[derive(Debug, Clone, Serialize)]
pub struct PostStats {
    pub total: i64,
    pub today: i64,
    pub this_month: i64,
}

/// Report queue health
#[derive(Debug, Clone, Serialize)]
pub struct ReportStats {
    pub total: i64,
    pub pending: i64,
    pub resolved: i64,
    pub rejected: i64,
    pub requires_attention: bool,
}

/// Engagement totals
#[derive(Debug, Clone, Serialize)]
pub struct EngagementStats {
    pub comments: i64,
    pub reactions: i64,
    pub likes: i64,
    pub dislikes: i64,
}

/// The full admin dashboard payload
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub users: UserStats,
    pub posts: PostStats,
    pub reports: ReportStats,
    pub engagement: EngagementStats,
}

impl DashboardStats {
    /// Collect all dashboard statistics
    pub async fn collect(pool: &SqlitePool) -> ApiResult<Self> {
        let users = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(CASE WHEN is_active = 1 THEN 1 END) AS active,
                COUNT(CASE WHEN is_active = 0 THEN 1 END) AS inactive,
                COUNT(CASE WHEN role = 'admin' THEN 1 END) AS admins,
                COUNT(CASE WHEN created_at >= datetime('now', 'start of day') THEN 1 END)
                    AS new_today,
                COUNT(CASE WHEN created_at >= datetime('now', '-7 days') THEN 1 END)
                    AS new_this_week
            FROM users
            "#,
        )
        .fetch_one(pool)
        .await
        .map_err(ApiError::Database)?;

        let posts = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(CASE WHEN created_at >= datetime('now', 'start of day') THEN 1 END)
                    AS today,
                COUNT(CASE WHEN created_at >= datetime('now', 'start of month') THEN 1 END)
                    AS this_month
            FROM posts
            "#,
        )
        .fetch_one(pool)
        .await
        .map_err(ApiError::Database)?;

        let reports = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(CASE WHEN status = 'pending' THEN 1 END) AS pending,
                COUNT(CASE WHEN status = 'resolved' THEN 1 END) AS resolved,
                COUNT(CASE WHEN status = 'rejected' THEN 1 END) AS rejected
            FROM reports
            "#,
        )
        .fetch_one(pool)
        .await
        .map_err(ApiError::Database)?;

        let engagement = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM comments) AS comments,
                COUNT(*) AS reactions,
                COUNT(CASE WHEN type = 'like' THEN 1 END) AS likes,
                COUNT(CASE WHEN type = 'dislike' THEN 1 END) AS dislikes
            FROM reactions
            "#,
        )
        .fetch_one(pool)
        .await
        .map_err(ApiError::Database)?;

        let pending: i64 = reports.try_get("pending")?;

        Ok(DashboardStats {
            users: UserStats {
                total: users.try_get("total")?,
                active: users.try_get("active")?,
                inactive: users.try_get("inactive")?,
                admins: users.try_get("admins")?,
                new_today: users.try_get("new_today")?,
                new_this_week: users.try_get("new_this_week")?,
            },
            posts: PostStats {
                total: posts.try_get("total")?,
                today: posts.try_get("today")?,
                this_month: posts.try_get("this_month")?,
            },
            reports: ReportStats {
                total: reports.try_get("total")?,
                pending,
                resolved: reports.try_get("resolved")?,
                rejected: reports.try_get("rejected")?,
                requires_attention: pending > ATTENTION_PENDING_REPORTS,
            },
            engagement: EngagementStats {
                comments: engagement.try_get("comments")?,
                reactions: engagement.try_get("reactions")?,
                likes: engagement.try_get("likes")?,
                dislikes: engagement.try_get("dislikes")?,
            },
        })
    }
}
