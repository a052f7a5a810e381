/// Admin endpoints
use crate::{
    admin::{DashboardStats, UserListFilter},
    api::middleware::require_admin,
    context::AppContext,
    error::{ApiResult, ResponseEnvelope},
    moderation::{ReportListFilter, ReportStatus},
};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/admin/dashboard", get(dashboard))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:id/status", patch(toggle_status))
        .route("/api/admin/reports", get(list_reports))
        .route("/api/admin/reports/:id", patch(resolve_report))
}

async fn dashboard(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    require_admin(&ctx, &headers).await?;

    let stats = DashboardStats::collect(&ctx.db).await?;

    Ok(Json(ResponseEnvelope::success(stats, "OK")))
}

async fn list_users(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(filter): Query<UserListFilter>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&ctx, &headers).await?;

    let page = ctx.admin_manager.list_users(&filter).await?;

    Ok(Json(ResponseEnvelope::success(page, "OK")))
}

async fn list_reports(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(filter): Query<ReportListFilter>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&ctx, &headers).await?;

    let page = ctx.report_manager.list(&filter).await?;

    Ok(Json(ResponseEnvelope::success(page, "OK")))
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    is_active: bool,
    admin_note: Option<String>,
}

async fn toggle_status(
    State(ctx): State<AppContext>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let admin = require_admin(&ctx, &headers).await?;

    let user = ctx.account_manager.set_active(user_id, req.is_active).await?;

    tracing::info!(
        admin_id = admin.user_id,
        user_id,
        is_active = req.is_active,
        note = req.admin_note.as_deref().unwrap_or(""),
        "admin changed account status"
    );

    let message = if req.is_active {
        "Account activated"
    } else {
        "Account deactivated"
    };

    Ok(Json(ResponseEnvelope::success(user, message)))
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    status: String,
    admin_note: Option<String>,
}

async fn resolve_report(
    State(ctx): State<AppContext>,
    Path(report_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<ResolveRequest>,
) -> ApiResult<impl IntoResponse> {
    let admin = require_admin(&ctx, &headers).await?;
    let status = ReportStatus::from_str(&req.status)?;

    let report = ctx
        .report_manager
        .resolve(report_id, status, req.admin_note, admin.user_id)
        .await?;

    Ok(Json(ResponseEnvelope::success(report, "Report updated")))
}
