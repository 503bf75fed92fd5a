//! Follow and block handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use real_core::model::{Block, Follow};

use crate::{context::RequestContext, handlers::AppError, state::AppState};

/// Follow a user, or ask to when they are private (POST /api/users/{user_id}/follow).
pub async fn follow(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let follow = state
        .managers
        .follower
        .request_to_follow(&ctx.user_id, &user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(follow)))
}

/// DELETE /api/users/{user_id}/follow
pub async fn unfollow(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.managers.follower.unfollow(&ctx.user_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accept a follower of the caller (POST /api/followers/{user_id}/accept).
pub async fn accept(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(follower_user_id): Path<String>,
) -> Result<Json<Follow>, AppError> {
    let follow = state
        .managers
        .follower
        .accept(&follower_user_id, &ctx.user_id)
        .await?;
    Ok(Json(follow))
}

/// Deny a follower of the caller (POST /api/followers/{user_id}/deny).
pub async fn deny(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(follower_user_id): Path<String>,
) -> Result<Json<Follow>, AppError> {
    let follow = state
        .managers
        .follower
        .deny(&follower_user_id, &ctx.user_id)
        .await?;
    Ok(Json(follow))
}

/// GET /api/users/{user_id}/followers
pub async fn list_followers(
    _ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let user_ids = state.managers.follower.list_follower_user_ids(&user_id).await?;
    Ok(Json(user_ids))
}

/// GET /api/users/{user_id}/followed
pub async fn list_followed(
    _ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let user_ids = state.managers.follower.list_followed_user_ids(&user_id).await?;
    Ok(Json(user_ids))
}

/// POST /api/users/{user_id}/block
pub async fn block(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let block: Block = state.managers.block.block(&ctx.user_id, &user_id).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

/// DELETE /api/users/{user_id}/block
pub async fn unblock(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.managers.block.unblock(&ctx.user_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
