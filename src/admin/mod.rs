/// Admin dashboard and user administration
///
/// Aggregate statistics for the dashboard plus the user listing and
/// status toggle used by moderators.
mod stats;

pub use stats::DashboardStats;

use crate::{
    account::{Role, User},
    error::{ApiError, ApiResult},
};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Filters for the admin user listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListFilter {
    /// `active` or `inactive`
    pub status: Option<String>,
    /// `user` or `admin`
    pub role: Option<String>,
    /// Substring match against name or email
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// One page of the admin user listing
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Admin user administration service
pub struct AdminManager {
    db: SqlitePool,
}

impl AdminManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// List users with optional status/role/search filters, paginated
    pub async fn list_users(&self, filter: &UserListFilter) -> ApiResult<UserPage> {
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(25).clamp(1, 100);

        let mut conditions = Vec::new();
        match filter.status.as_deref() {
            Some("active") => conditions.push("is_active = 1".to_string()),
            Some("inactive") => conditions.push("is_active = 0".to_string()),
            Some(other) => {
                return Err(ApiError::Validation(format!(
                    "Invalid status filter: {}",
                    other
                )))
            }
            None => {}
        }
        if let Some(role) = filter.role.as_deref() {
            // Validates the value; the bound parameter below carries it
            Role::from_str(role)?;
            conditions.push("role = ?".to_string());
        }
        if filter.search.is_some() {
            conditions.push("(name LIKE ? OR email LIKE ?)".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let list_sql = format!(
            "SELECT id, name, email, password_hash, role, profile_pic, birthday,
                    is_active, email_verified_at, email_verification_token,
                    password_reset_token, password_reset_expires, created_at
             FROM users {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let search_pattern = filter.search.as_ref().map(|s| format!("%{}%", s));

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut list_query = sqlx::query(&list_sql);
        if let Some(role) = filter.role.as_deref() {
            count_query = count_query.bind(role.to_lowercase());
            list_query = list_query.bind(role.to_lowercase());
        }
        if let Some(pattern) = &search_pattern {
            count_query = count_query.bind(pattern).bind(pattern);
            list_query = list_query.bind(pattern).bind(pattern);
        }

        let total = count_query
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

        let rows = list_query
            .bind(per_page)
            .bind((page - 1) * per_page)
            .fetch_all(&self.db)
            .await
            .map_err(ApiError::Database)?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let role_str: String = row.try_get("role")?;
            users.push(User {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                password_hash: row.try_get("password_hash")?,
                role: Role::from_str(&role_str)?,
                profile_pic: row.try_get("profile_pic")?,
                birthday: row.try_get("birthday")?,
                is_active: row.try_get("is_active")?,
                email_verified_at: row.try_get("email_verified_at")?,
                email_verification_token: row.try_get("email_verification_token")?,
                password_reset_token: row.try_get("password_reset_token")?,
                password_reset_expires: row.try_get("password_reset_expires")?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(UserPage {
            users,
            total,
            page,
            per_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_manager() -> AdminManager {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO users (name, email, password_hash, role, birthday, is_active, created_at)
             VALUES ('Ada', 'ada@example.com', 'x', 'admin', '2000-01-01', 1, datetime('now')),
                    ('Ben', 'ben@example.com', 'x', 'user', '2004-01-01', 1, datetime('now')),
                    ('Cleo', 'cleo@example.com', 'x', 'user', '2005-01-01', 0, datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap();

        AdminManager::new(pool)
    }

    #[tokio::test]
    async fn test_list_users_unfiltered() {
        let manager = test_manager().await;

        let page = manager.list_users(&UserListFilter::default()).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.users.len(), 3);
    }

    #[tokio::test]
    async fn test_list_users_status_filter() {
        let manager = test_manager().await;

        let page = manager
            .list_users(&UserListFilter {
                status: Some("inactive".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.users[0].name, "Cleo");
    }

    #[tokio::test]
    async fn test_list_users_role_and_search() {
        let manager = test_manager().await;

        let admins = manager
            .list_users(&UserListFilter {
                role: Some("admin".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(admins.total, 1);
        assert_eq!(admins.users[0].name, "Ada");

        let found = manager
            .list_users(&UserListFilter {
                search: Some("ben@".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.users[0].name, "Ben");
    }

    #[tokio::test]
    async fn test_list_users_pagination() {
        let manager = test_manager().await;

        let page = manager
            .list_users(&UserListFilter {
                per_page: Some(2),
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.users.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_status_filter() {
        let manager = test_manager().await;

        assert!(matches!(
            manager
                .list_users(&UserListFilter {
                    status: Some("banana".into()),
                    ..Default::default()
                })
                .await
                .unwrap_err(),
            ApiError::Validation(_)
        ));
    }
}
