/// Post reporting endpoints
use crate::{
    api::middleware::{require_admin, require_auth},
    context::AppContext,
    error::{ApiResult, ResponseEnvelope},
    moderation::{ReportReason, ThresholdAction},
    notify::NotificationKind,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/posts/:id/report", post(report_post))
        .route("/api/posts/:id/reports", get(post_reports))
}

#[derive(Debug, Deserialize)]
struct ReportRequest {
    reason: String,
    description: Option<String>,
}

async fn report_post(
    State(ctx): State<AppContext>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<ReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let auth = require_auth(&ctx, &headers).await?;
    let reason = ReportReason::from_str(&req.reason)?;

    let outcome = ctx
        .report_manager
        .submit(post_id, auth.user_id, reason, req.description)
        .await?;

    // The report is committed; notify the post owner after the fact.
    // Delivery failure is logged and recorded, never surfaced here.
    if let Some(action) = outcome.triggered {
        let kind = match action {
            ThresholdAction::Warning => NotificationKind::ReportWarning {
                report_count: outcome.total_reports,
            },
            ThresholdAction::Deactivation => NotificationKind::AccountDeactivated {
                report_count: outcome.total_reports,
            },
        };

        match ctx.account_manager.get_user(outcome.post_owner_id).await {
            Ok(owner) => {
                ctx.notifier.send(kind, &owner).await;
            }
            Err(e) => {
                tracing::error!(
                    post_owner_id = outcome.post_owner_id,
                    error = %e,
                    "could not load post owner for threshold notification"
                );
            }
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(ResponseEnvelope::success(
            outcome,
            "Report submitted. Thank you for helping keep the community safe",
        )),
    ))
}

async fn post_reports(
    State(ctx): State<AppContext>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    require_admin(&ctx, &headers).await?;

    let summary = ctx.report_manager.list_for_post(post_id).await?;

    Ok(Json(ResponseEnvelope::success(summary, "OK")))
}
