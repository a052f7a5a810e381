/// Account management system
///
/// Handles user registration, email verification, authentication, sessions,
/// password reset, and account activation state.
mod manager;
mod tokens;

pub use manager::AccountManager;
pub use tokens::{TokenIssuer, TOKEN_LENGTH};

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(ApiError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// User record
///
/// A user can authenticate only if `email_verified_at` is set AND
/// `is_active` is true.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub profile_pic: Option<String>,
    pub birthday: NaiveDate,
    pub is_active: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub email_verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_verified_email(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// Public profile payload: the user plus activity counts
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub user: User,
    pub posts: i64,
    pub comments: i64,
    pub reactions: i64,
}

/// Session record backing a bearer token
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Authenticated identity extracted from a bearer token and passed
/// explicitly into every operation
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub session_id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub password_confirmation: String,
    /// YYYY-MM-DD
    pub birthday: String,
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response payload
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub token_type: &'static str,
}

/// Profile update request: explicit allowed-field projection. Activation
/// state, role, and token columns are never settable through this payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub birthday: Option<String>,
    pub profile_pic: Option<String>,
}

/// Password change request (authenticated)
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Password reset request (by token)
#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
    pub password_confirmation: String,
}
