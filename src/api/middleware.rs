/// Authentication and authorization helpers
use crate::{
    account::AuthUser,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::http::HeaderMap;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| {
            if s.starts_with("Bearer ") {
                Some(s[7..].to_string())
            } else {
                None
            }
        })
}

/// Require authentication - extract the caller's identity or return 401
pub async fn require_auth(ctx: &AppContext, headers: &HeaderMap) -> ApiResult<AuthUser> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    ctx.account_manager.validate_access_token(&token).await
}

/// Require an admin caller or return 403
pub async fn require_admin(ctx: &AppContext, headers: &HeaderMap) -> ApiResult<AuthUser> {
    let auth = require_auth(ctx, headers).await?;

    if !auth.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(auth)
}

/// Best-effort identity for endpoints that personalize but do not require
/// auth. Invalid or missing tokens yield None.
pub async fn optional_auth(ctx: &AppContext, headers: &HeaderMap) -> Option<AuthUser> {
    let token = extract_bearer_token(headers)?;
    ctx.account_manager.validate_access_token(&token).await.ok()
}
