/// Account manager implementation using runtime queries
///
/// Owns the user lifecycle: Unverified (is_active=false, no verified
/// timestamp) -> Active (verified + is_active) -> Deactivated (verified but
/// is_active=false). Deactivation comes from an admin or the report
/// threshold engine; reactivation is a manual admin action.
use crate::{
    account::{
        AuthUser, PublicProfile, RegisterRequest, Role, Session, TokenIssuer,
        UpdateProfileRequest, User,
    },
    config::ServerConfig,
    error::{ApiError, ApiResult},
    validation,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    tokens: TokenIssuer,
}

impl AccountManager {
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self {
            db,
            config,
            tokens: TokenIssuer::new(),
        }
    }

    /// Register a new account in the Unverified state.
    ///
    /// Returns the created user together with the email verification token
    /// so the caller can dispatch the verification notification.
    pub async fn register(&self, req: &RegisterRequest) -> ApiResult<(User, String)> {
        if req.name.is_empty() || req.name.len() > 255 {
            return Err(ApiError::Validation(
                "Name must be between 1 and 255 characters".to_string(),
            ));
        }
        validation::validate_email(&req.email)?;
        validation::validate_password(&req.password, &req.password_confirmation)?;

        let birthday = validation::parse_birthday(&req.birthday)?;
        validation::validate_age_range(birthday)?;

        let role = match &req.role {
            Some(r) => Role::from_str(r)?,
            None => Role::User,
        };

        if self.email_exists(&req.email).await? {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;

        let verification_token = self.tokens.issue_verification();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users
            (name, email, password_hash, role, birthday, is_active,
             email_verification_token, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)
            "#,
        )
        .bind(&req.name)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(birthday)
        .bind(&verification_token)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| match &e {
            // Backstop for the check-then-insert race on the email column
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("Email already registered".to_string())
            }
            _ => ApiError::Database(e),
        })?;

        let user = User {
            id: result.last_insert_rowid(),
            name: req.name.clone(),
            email: req.email.clone(),
            password_hash,
            role,
            profile_pic: None,
            birthday,
            is_active: false,
            email_verified_at: None,
            email_verification_token: Some(verification_token.clone()),
            password_reset_token: None,
            password_reset_expires: None,
            created_at: now,
        };

        tracing::info!(user_id = user.id, "account registered, awaiting email verification");

        Ok((user, verification_token))
    }

    /// Authenticate and create a session.
    ///
    /// Failure order matters: bad credentials (401) are reported before any
    /// account-state information; then the unverified-email check, then the
    /// deactivated check, with distinguishable messages.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(User, Session)> {
        let user = match self.get_user_by_email(email).await {
            Ok(user) => user,
            Err(ApiError::NotFound(_)) => {
                return Err(ApiError::Unauthorized("Invalid credentials".to_string()))
            }
            Err(e) => return Err(e),
        };

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|e| ApiError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }

        if !user.has_verified_email() {
            return Err(ApiError::Forbidden(
                "Email not confirmed. Verify your email address before logging in".to_string(),
            ));
        }

        if !user.is_active {
            return Err(ApiError::Forbidden(
                "Account deactivated. Contact an administrator".to_string(),
            ));
        }

        let session = self.create_session(&user).await?;

        Ok((user, session))
    }

    /// Create a session for a user
    pub async fn create_session(&self, user: &User) -> ApiResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.authentication.session_ttl);

        let token = self.generate_access_token(user.id, &session_id, now, expires_at)?;

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session_id)
        .bind(user.id)
        .bind(&token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(Session {
            id: session_id,
            user_id: user.id,
            token,
            created_at: now,
            expires_at,
        })
    }

    /// Validate a bearer token and return the explicit request identity
    pub async fn validate_access_token(&self, token: &str) -> ApiResult<AuthUser> {
        let row = sqlx::query(
            r#"
            SELECT s.id AS session_id, s.expires_at, u.id AS user_id, u.role
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = ?1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))?;

        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        if Utc::now() > expires_at {
            return Err(ApiError::Unauthorized("Session expired".to_string()));
        }

        let role_str: String = row.try_get("role")?;

        Ok(AuthUser {
            user_id: row.try_get("user_id")?,
            session_id: row.try_get("session_id")?,
            role: Role::from_str(&role_str)?,
        })
    }

    /// Delete a session (logout)
    pub async fn delete_session(&self, session_id: &str) -> ApiResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(())
    }

    /// Verify an email address: Unverified -> Active.
    ///
    /// The single UPDATE both consumes the token and flips the account
    /// state, so a concurrent retry cannot reuse the link.
    pub async fn verify_email(&self, token: &str) -> ApiResult<User> {
        let user_id: i64 =
            sqlx::query_scalar("SELECT id FROM users WHERE email_verification_token = ?1")
                .bind(token)
                .fetch_optional(&self.db)
                .await
                .map_err(ApiError::Database)?
                .ok_or(ApiError::InvalidToken)?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified_at = ?1,
                email_verification_token = NULL,
                is_active = 1
            WHERE id = ?2 AND email_verification_token = ?3
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(token)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        // Lost a race with a concurrent consume of the same link
        if result.rows_affected() == 0 {
            return Err(ApiError::InvalidToken);
        }

        tracing::info!(user_id, "email verified, account activated");

        self.get_user(user_id).await
    }

    /// Re-issue a verification token for an unverified account.
    ///
    /// Replaces any previously issued token; old links stop working.
    pub async fn resend_verification(&self, email: &str) -> ApiResult<(User, String)> {
        let user = self.get_user_by_email(email).await?;

        if user.has_verified_email() {
            return Err(ApiError::Conflict("Email already verified".to_string()));
        }

        let token = self.tokens.issue_verification();

        sqlx::query("UPDATE users SET email_verification_token = ?1 WHERE id = ?2")
            .bind(&token)
            .bind(user.id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok((user, token))
    }

    /// Issue a password reset token with a one-hour expiry.
    ///
    /// Deliberately independent of activation state: a deactivated user may
    /// still reset their password.
    pub async fn request_password_reset(&self, email: &str) -> ApiResult<(User, String)> {
        let user = self.get_user_by_email(email).await?;

        let now = Utc::now();
        let (token, expires_at) = self.tokens.issue_reset(now);

        sqlx::query(
            "UPDATE users SET password_reset_token = ?1, password_reset_expires = ?2
             WHERE id = ?3",
        )
        .bind(&token)
        .bind(expires_at)
        .bind(user.id)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok((user, token))
    }

    /// Reset a password using a reset token.
    ///
    /// The token is consumed first, inside the same transaction as the
    /// password write, so a failed retry can never reuse it. All existing
    /// sessions for the user are invalidated.
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirmation: &str,
    ) -> ApiResult<()> {
        validation::validate_password(password, confirmation)?;

        let now = Utc::now();
        let user = match self.get_user_by_reset_token(token).await {
            Ok(user) => user,
            // Not-found and expired are indistinguishable to the caller
            Err(ApiError::NotFound(_)) => return Err(ApiError::InvalidToken),
            Err(e) => return Err(e),
        };

        if !self.tokens.reset_token_matches(
            user.password_reset_token.as_deref(),
            user.password_reset_expires,
            token,
            now,
        ) {
            return Err(ApiError::InvalidToken);
        }

        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;

        let mut tx = self.db.begin().await.map_err(ApiError::Database)?;

        // Consume the token before any other mutation that could fail
        let consumed = sqlx::query(
            "UPDATE users SET password_reset_token = NULL, password_reset_expires = NULL
             WHERE id = ?1 AND password_reset_token = ?2",
        )
        .bind(user.id)
        .bind(token)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::Database)?;

        if consumed.rows_affected() == 0 {
            return Err(ApiError::InvalidToken);
        }

        sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
            .bind(&password_hash)
            .bind(user.id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::Database)?;

        // Invalidate every previously issued session
        sqlx::query("DELETE FROM sessions WHERE user_id = ?1")
            .bind(user.id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::Database)?;

        tx.commit().await.map_err(ApiError::Database)?;

        tracing::info!(user_id = user.id, "password reset, sessions invalidated");

        Ok(())
    }

    /// Change password for an authenticated user
    pub async fn change_password(
        &self,
        user_id: i64,
        current: &str,
        password: &str,
        confirmation: &str,
    ) -> ApiResult<()> {
        validation::validate_password(password, confirmation)?;

        let user = self.get_user(user_id).await?;

        let valid = bcrypt::verify(current, &user.password_hash)
            .map_err(|e| ApiError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(ApiError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;

        sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
            .bind(&password_hash)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(())
    }

    /// Update profile fields through an explicit projection.
    ///
    /// Only name, email, birthday, and profile_pic are settable here;
    /// activation state and token columns are out of reach by construction.
    pub async fn update_profile(
        &self,
        user_id: i64,
        req: &UpdateProfileRequest,
    ) -> ApiResult<User> {
        let user = self.get_user(user_id).await?;

        let name = match &req.name {
            Some(name) if name.is_empty() || name.len() > 255 => {
                return Err(ApiError::Validation(
                    "Name must be between 1 and 255 characters".to_string(),
                ))
            }
            Some(name) => name.clone(),
            None => user.name.clone(),
        };

        let email = match &req.email {
            Some(email) => {
                validation::validate_email(email)?;
                if email != &user.email && self.email_exists(email).await? {
                    return Err(ApiError::Conflict("Email already registered".to_string()));
                }
                email.clone()
            }
            None => user.email.clone(),
        };

        let birthday = match &req.birthday {
            Some(raw) => {
                let birthday = validation::parse_birthday(raw)?;
                validation::validate_age_range(birthday)?;
                birthday
            }
            None => user.birthday,
        };

        let profile_pic = match &req.profile_pic {
            Some(pic) => Some(pic.clone()),
            None => user.profile_pic.clone(),
        };

        sqlx::query(
            "UPDATE users SET name = ?1, email = ?2, birthday = ?3, profile_pic = ?4
             WHERE id = ?5",
        )
        .bind(&name)
        .bind(&email)
        .bind(birthday)
        .bind(&profile_pic)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        self.get_user(user_id).await
    }

    /// Flip the activation flag. Used by the admin status toggle; the report
    /// threshold engine performs its deactivation write inside its own
    /// transaction instead.
    pub async fn set_active(&self, user_id: i64, is_active: bool) -> ApiResult<User> {
        let result = sqlx::query("UPDATE users SET is_active = ?1 WHERE id = ?2")
            .bind(is_active)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        self.get_user(user_id).await
    }

    /// Get user by id
    pub async fn get_user(&self, user_id: i64) -> ApiResult<User> {
        let row = sqlx::query(&user_select("WHERE id = ?1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::Database)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        parse_user(row)
    }

    /// Public profile with activity counts
    pub async fn get_profile(&self, user_id: i64) -> ApiResult<PublicProfile> {
        let user = self.get_user(user_id).await?;

        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM posts WHERE user_id = ?1) AS posts,
                (SELECT COUNT(*) FROM comments WHERE user_id = ?1) AS comments,
                (SELECT COUNT(*) FROM reactions WHERE user_id = ?1) AS reactions
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(PublicProfile {
            user,
            posts: row.try_get("posts")?,
            comments: row.try_get("comments")?,
            reactions: row.try_get("reactions")?,
        })
    }

    /// Get user by email
    pub async fn get_user_by_email(&self, email: &str) -> ApiResult<User> {
        let row = sqlx::query(&user_select("WHERE email = ?1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::Database)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        parse_user(row)
    }

    async fn get_user_by_reset_token(&self, token: &str) -> ApiResult<User> {
        let row = sqlx::query(&user_select("WHERE password_reset_token = ?1"))
            .bind(token)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::Database)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        parse_user(row)
    }

    async fn email_exists(&self, email: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(count > 0)
    }

    /// Generate the access JWT backing a session row
    fn generate_access_token(
        &self,
        user_id: i64,
        session_id: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> ApiResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde::{Deserialize, Serialize};

        #[derive(Debug, Serialize, Deserialize)]
        struct Claims {
            sub: String,
            sid: String,
            iat: i64,
            exp: i64,
        }

        let claims = Claims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }
}

fn user_select(where_clause: &str) -> String {
    format!(
        "SELECT id, name, email, password_hash, role, profile_pic, birthday,
                is_active, email_verified_at, email_verification_token,
                password_reset_token, password_reset_expires, created_at
         FROM users {}",
        where_clause
    )
}

fn parse_user(row: sqlx::sqlite::SqliteRow) -> ApiResult<User> {
    let role_str: String = row.try_get("role")?;

    Ok(User {
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
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::TOKEN_LENGTH;

    async fn test_manager() -> AccountManager {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        AccountManager::new(pool, Arc::new(ServerConfig::test_defaults()))
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Jamie Maker".into(),
            email: email.into(),
            password: "supersecret".into(),
            password_confirmation: "supersecret".into(),
            birthday: "2004-02-10".into(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_register_starts_unverified_and_inactive() {
        let manager = test_manager().await;

        let (user, token) = manager
            .register(&register_request("jamie@example.com"))
            .await
            .unwrap();

        assert!(!user.is_active);
        assert!(user.email_verified_at.is_none());
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let manager = test_manager().await;

        manager
            .register(&register_request("dup@example.com"))
            .await
            .unwrap();
        let err = manager
            .register(&register_request("dup@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_enforces_age_range() {
        let manager = test_manager().await;

        let mut too_young = register_request("young@example.com");
        too_young.birthday = (Utc::now().date_naive() - Duration::days(10 * 365))
            .format("%Y-%m-%d")
            .to_string();
        assert!(matches!(
            manager.register(&too_young).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        let mut too_old = register_request("old@example.com");
        too_old.birthday = "1970-01-01".into();
        assert!(matches!(
            manager.register(&too_old).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_password_mismatch() {
        let manager = test_manager().await;

        let mut req = register_request("mismatch@example.com");
        req.password_confirmation = "different!".into();

        assert!(matches!(
            manager.register(&req).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_verify_email_activates_account() {
        let manager = test_manager().await;

        let (_, token) = manager
            .register(&register_request("verify@example.com"))
            .await
            .unwrap();
        let user = manager.verify_email(&token).await.unwrap();

        assert!(user.is_active);
        assert!(user.email_verified_at.is_some());
        assert!(user.email_verification_token.is_none());

        // Token is single use
        assert!(matches!(
            manager.verify_email(&token).await.unwrap_err(),
            ApiError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn test_verify_email_unknown_token() {
        let manager = test_manager().await;

        assert!(matches!(
            manager.verify_email("nope").await.unwrap_err(),
            ApiError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn test_login_requires_verified_email_first() {
        let manager = test_manager().await;

        manager
            .register(&register_request("unverified@example.com"))
            .await
            .unwrap();

        // Correct credentials, but unverified: the email check wins
        let err = manager
            .login("unverified@example.com", "supersecret")
            .await
            .unwrap_err();
        match err {
            ApiError::Forbidden(msg) => assert!(msg.contains("Email not confirmed")),
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_reports_deactivated_account_distinctly() {
        let manager = test_manager().await;

        let (user, token) = manager
            .register(&register_request("deactivated@example.com"))
            .await
            .unwrap();
        manager.verify_email(&token).await.unwrap();
        manager.set_active(user.id, false).await.unwrap();

        let err = manager
            .login("deactivated@example.com", "supersecret")
            .await
            .unwrap_err();
        match err {
            ApiError::Forbidden(msg) => assert!(msg.contains("Account deactivated")),
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let manager = test_manager().await;

        let (_, token) = manager
            .register(&register_request("creds@example.com"))
            .await
            .unwrap();
        manager.verify_email(&token).await.unwrap();

        assert!(matches!(
            manager
                .login("creds@example.com", "wrongpassword")
                .await
                .unwrap_err(),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            manager
                .login("nobody@example.com", "supersecret")
                .await
                .unwrap_err(),
            ApiError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn test_full_lifecycle_register_verify_login() {
        let manager = test_manager().await;

        let (user, token) = manager
            .register(&register_request("lifecycle@example.com"))
            .await
            .unwrap();
        assert!(!user.is_active);

        let verified = manager.verify_email(&token).await.unwrap();
        assert!(verified.is_active);
        assert!(verified.email_verified_at.is_some());

        let (user, session) = manager
            .login("lifecycle@example.com", "supersecret")
            .await
            .unwrap();
        assert_eq!(user.email, "lifecycle@example.com");

        let auth = manager.validate_access_token(&session.token).await.unwrap();
        assert_eq!(auth.user_id, user.id);
    }

    #[tokio::test]
    async fn test_resend_verification_replaces_token() {
        let manager = test_manager().await;

        let (_, first) = manager
            .register(&register_request("resend@example.com"))
            .await
            .unwrap();
        let (_, second) = manager
            .resend_verification("resend@example.com")
            .await
            .unwrap();

        assert_ne!(first, second);
        // The replaced link is dead
        assert!(matches!(
            manager.verify_email(&first).await.unwrap_err(),
            ApiError::InvalidToken
        ));
        manager.verify_email(&second).await.unwrap();
    }

    #[tokio::test]
    async fn test_resend_verification_fails_when_verified() {
        let manager = test_manager().await;

        let (_, token) = manager
            .register(&register_request("done@example.com"))
            .await
            .unwrap();
        manager.verify_email(&token).await.unwrap();

        assert!(matches!(
            manager
                .resend_verification("done@example.com")
                .await
                .unwrap_err(),
            ApiError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_reset_password_consumes_token() {
        let manager = test_manager().await;

        let (user, token) = manager
            .register(&register_request("reset@example.com"))
            .await
            .unwrap();
        manager.verify_email(&token).await.unwrap();

        let (_, reset_token) = manager
            .request_password_reset("reset@example.com")
            .await
            .unwrap();

        manager
            .reset_password(&reset_token, "newpassword", "newpassword")
            .await
            .unwrap();

        // Old password no longer works, new one does
        assert!(manager
            .login("reset@example.com", "supersecret")
            .await
            .is_err());
        manager.login("reset@example.com", "newpassword").await.unwrap();

        // Single use: a repeat with the same token fails
        assert!(matches!(
            manager
                .reset_password(&reset_token, "another123", "another123")
                .await
                .unwrap_err(),
            ApiError::InvalidToken
        ));

        let _ = user;
    }

    #[tokio::test]
    async fn test_reset_password_invalidates_sessions() {
        let manager = test_manager().await;

        let (_, token) = manager
            .register(&register_request("sessions@example.com"))
            .await
            .unwrap();
        manager.verify_email(&token).await.unwrap();
        let (_, session) = manager
            .login("sessions@example.com", "supersecret")
            .await
            .unwrap();

        let (_, reset_token) = manager
            .request_password_reset("sessions@example.com")
            .await
            .unwrap();
        manager
            .reset_password(&reset_token, "newpassword", "newpassword")
            .await
            .unwrap();

        assert!(manager.validate_access_token(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn test_reset_password_rejects_expired_token() {
        let manager = test_manager().await;

        let (user, token) = manager
            .register(&register_request("expired@example.com"))
            .await
            .unwrap();
        manager.verify_email(&token).await.unwrap();
        let (_, reset_token) = manager
            .request_password_reset("expired@example.com")
            .await
            .unwrap();

        // Age the token past its one-hour window
        sqlx::query("UPDATE users SET password_reset_expires = ?1 WHERE id = ?2")
            .bind(Utc::now() - Duration::minutes(1))
            .bind(user.id)
            .execute(&manager.db)
            .await
            .unwrap();

        assert!(matches!(
            manager
                .reset_password(&reset_token, "newpassword", "newpassword")
                .await
                .unwrap_err(),
            ApiError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn test_reset_works_for_deactivated_user() {
        let manager = test_manager().await;

        let (user, token) = manager
            .register(&register_request("locked@example.com"))
            .await
            .unwrap();
        manager.verify_email(&token).await.unwrap();
        manager.set_active(user.id, false).await.unwrap();

        let (_, reset_token) = manager
            .request_password_reset("locked@example.com")
            .await
            .unwrap();
        manager
            .reset_password(&reset_token, "newpassword", "newpassword")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_profile_cannot_touch_activation() {
        let manager = test_manager().await;

        let (user, token) = manager
            .register(&register_request("profile@example.com"))
            .await
            .unwrap();
        manager.verify_email(&token).await.unwrap();

        let updated = manager
            .update_profile(
                user.id,
                &UpdateProfileRequest {
                    name: Some("New Name".into()),
                    email: None,
                    birthday: None,
                    profile_pic: Some("avatar.png".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.profile_pic.as_deref(), Some("avatar.png"));
        // The projection never exposes is_active
        assert!(updated.is_active);
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let manager = test_manager().await;

        let (user, token) = manager
            .register(&register_request("change@example.com"))
            .await
            .unwrap();
        manager.verify_email(&token).await.unwrap();

        assert!(matches!(
            manager
                .change_password(user.id, "wrong", "newpassword", "newpassword")
                .await
                .unwrap_err(),
            ApiError::Validation(_)
        ));

        manager
            .change_password(user.id, "supersecret", "newpassword", "newpassword")
            .await
            .unwrap();
        manager.login("change@example.com", "newpassword").await.unwrap();
    }
}
