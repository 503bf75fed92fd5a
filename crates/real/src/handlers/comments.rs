//! Comment handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use real_core::model::{Comment, FlaggedItem};

use crate::{context::RequestContext, handlers::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    pub text: String,
}

/// POST /api/posts/{post_id}/comments
pub async fn create_comment(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(payload): Json<CreateComment>,
) -> Result<impl IntoResponse, AppError> {
    let comment = state
        .managers
        .comment
        .add_comment(&ctx.user_id, &post_id, &payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/posts/{post_id}/comments
pub async fn list_comments(
    _ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let comments = state.managers.comment.list_comments(&post_id).await?;
    Ok(Json(comments))
}

/// DELETE /api/comments/{comment_id}
pub async fn delete_comment(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .managers
        .comment
        .delete_comment(&comment_id, &ctx.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/comments/{comment_id}/flag
pub async fn flag_comment(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let flag = state
        .managers
        .comment
        .flag_comment(&comment_id, &ctx.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(flag)))
}

/// DELETE /api/comments/{comment_id}/flag
pub async fn unflag_comment(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .managers
        .flag
        .unflag(&FlaggedItem::Comment(comment_id), &ctx.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
