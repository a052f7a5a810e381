/// Account and authentication endpoints
use crate::{
    account::{
        ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
        ResetPasswordRequest, UpdateProfileRequest,
    },
    api::middleware::require_auth,
    context::AppContext,
    error::{ApiError, ApiResult, ResponseEnvelope},
    notify::NotificationKind,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/me", get(me))
        .route("/api/users/:id", get(public_profile))
        .route("/api/profile", patch(update_profile))
        .route("/api/change-password", post(change_password))
        .route("/api/verify-email", get(verify_email))
        .route("/api/resend-verification", post(resend_verification))
        .route("/api/request-password-reset", post(request_password_reset))
        .route("/api/reset-password", post(reset_password))
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let (user, token) = ctx.account_manager.register(&req).await?;

    // Delivery failure never fails the registration
    ctx.notifier
        .send(NotificationKind::EmailVerification { token }, &user)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(ResponseEnvelope::success(
            user,
            "Registration successful. Check your email to verify your account",
        )),
    ))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, session) = ctx.account_manager.login(&req.email, &req.password).await?;

    Ok(Json(ResponseEnvelope::success(
        LoginResponse {
            user,
            access_token: session.token,
            token_type: "Bearer",
        },
        "Login successful",
    )))
}

async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let auth = require_auth(&ctx, &headers).await?;
    ctx.account_manager.delete_session(&auth.session_id).await?;

    Ok(Json(ResponseEnvelope::success_empty("Logged out")))
}

async fn me(State(ctx): State<AppContext>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    let auth = require_auth(&ctx, &headers).await?;
    let user = ctx.account_manager.get_user(auth.user_id).await?;

    Ok(Json(ResponseEnvelope::success(user, "OK")))
}

async fn public_profile(
    State(ctx): State<AppContext>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let profile = ctx.account_manager.get_profile(user_id).await?;

    Ok(Json(ResponseEnvelope::success(profile, "OK")))
}

async fn update_profile(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let auth = require_auth(&ctx, &headers).await?;
    let user = ctx.account_manager.update_profile(auth.user_id, &req).await?;

    Ok(Json(ResponseEnvelope::success(user, "Profile updated")))
}

async fn change_password(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let auth = require_auth(&ctx, &headers).await?;
    ctx.account_manager
        .change_password(
            auth.user_id,
            &req.current_password,
            &req.password,
            &req.password_confirmation,
        )
        .await?;

    Ok(Json(ResponseEnvelope::success_empty("Password changed")))
}

#[derive(Debug, Deserialize)]
struct VerifyEmailParams {
    token: String,
}

async fn verify_email(
    State(ctx): State<AppContext>,
    Query(params): Query<VerifyEmailParams>,
) -> ApiResult<impl IntoResponse> {
    let user = ctx.account_manager.verify_email(&params.token).await?;

    Ok(Json(ResponseEnvelope::success(
        user,
        "Email verified. Your account is now active",
    )))
}

#[derive(Debug, Deserialize)]
struct EmailParams {
    email: String,
}

async fn resend_verification(
    State(ctx): State<AppContext>,
    Json(params): Json<EmailParams>,
) -> ApiResult<impl IntoResponse> {
    let (user, token) = ctx.account_manager.resend_verification(&params.email).await?;

    ctx.notifier
        .send(NotificationKind::EmailVerification { token }, &user)
        .await;

    Ok(Json(ResponseEnvelope::success_empty(
        "Verification email sent",
    )))
}

async fn request_password_reset(
    State(ctx): State<AppContext>,
    Json(params): Json<EmailParams>,
) -> ApiResult<impl IntoResponse> {
    let (user, token) = ctx
        .account_manager
        .request_password_reset(&params.email)
        .await?;

    ctx.notifier
        .send(NotificationKind::PasswordReset { token }, &user)
        .await;

    Ok(Json(ResponseEnvelope::success_empty(
        "Password reset email sent. The link expires in 1 hour",
    )))
}

async fn reset_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.account_manager
        .reset_password(&req.token, &req.password, &req.password_confirmation)
        .await?;

    Ok(Json(ResponseEnvelope::success_empty(
        "Password reset successful. Please log in with your new password",
    )))
}
