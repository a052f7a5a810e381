/// Post reaction endpoints
use crate::{
    api::middleware::{optional_auth, require_auth},
    context::AppContext,
    error::{ApiResult, ResponseEnvelope},
    reactions::{ReactionAction, ReactionType},
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/posts/:id/reactions",
            post(react).get(stats).delete(remove),
        )
        .route("/api/posts/:id/reactions/me", get(my_reaction))
}

#[derive(Debug, Deserialize)]
struct ReactionRequest {
    #[serde(rename = "type")]
    reaction_type: String,
}

async fn react(
    State(ctx): State<AppContext>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<ReactionRequest>,
) -> ApiResult<impl IntoResponse> {
    let auth = require_auth(&ctx, &headers).await?;
    let reaction = ReactionType::from_str(&req.reaction_type)?;

    let action = ctx
        .reaction_manager
        .react(post_id, auth.user_id, reaction)
        .await?;
    let stats = ctx
        .reaction_manager
        .stats(post_id, Some(auth.user_id))
        .await?;

    let message = match action {
        ReactionAction::Added => "Reaction added",
        ReactionAction::Removed => "Reaction removed",
        ReactionAction::Switched => "Reaction updated",
    };

    Ok(Json(ResponseEnvelope::success(
        json!({ "action": action, "stats": stats }),
        message,
    )))
}

async fn stats(
    State(ctx): State<AppContext>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let auth = optional_auth(&ctx, &headers).await;
    let stats = ctx
        .reaction_manager
        .stats(post_id, auth.map(|a| a.user_id))
        .await?;

    Ok(Json(ResponseEnvelope::success(stats, "OK")))
}

async fn remove(
    State(ctx): State<AppContext>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let auth = require_auth(&ctx, &headers).await?;
    ctx.reaction_manager.remove(post_id, auth.user_id).await?;

    Ok(Json(ResponseEnvelope::success_empty("Reaction removed")))
}

async fn my_reaction(
    State(ctx): State<AppContext>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let auth = require_auth(&ctx, &headers).await?;
    // 404s on a missing post before reporting an empty reaction
    ctx.post_store.get_post(post_id).await?;
    let reaction = ctx
        .reaction_manager
        .reaction_of(post_id, auth.user_id)
        .await?;

    Ok(Json(ResponseEnvelope::success(
        json!({ "reaction": reaction }),
        "OK",
    )))
}
