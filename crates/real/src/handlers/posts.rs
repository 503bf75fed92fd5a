//! Post handlers, including likes, flags and views on posts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use real_core::model::{
    FlaggedItem, Like, LikeStatus, Post, PostError, PostType, ViewedStatus,
};

use crate::{
    context::RequestContext,
    handlers::AppError,
    managers::{ManagerError, NewPost, PostDetails},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub post_id: Option<String>,
    #[serde(default = "default_post_type")]
    pub post_type: PostType,
    pub text: Option<String>,
    pub album_id: Option<String>,
    /// Seconds until the post expires.
    pub lifetime: Option<i64>,
    #[serde(default)]
    pub likes_disabled: bool,
    #[serde(default)]
    pub comments_disabled: bool,
}

fn default_post_type() -> PostType {
    PostType::TextOnly
}

impl From<CreatePost> for NewPost {
    fn from(payload: CreatePost) -> Self {
        Self {
            post_id: payload.post_id,
            post_type: payload.post_type,
            text: payload.text,
            album_id: payload.album_id,
            lifetime: payload.lifetime.map(Duration::seconds),
            likes_disabled: payload.likes_disabled,
            comments_disabled: payload.comments_disabled,
        }
    }
}

/// A post as seen by the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub viewed_status: ViewedStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikePost {
    #[serde(default = "default_like_status")]
    pub like_status: LikeStatus,
}

fn default_like_status() -> LikeStatus {
    LikeStatus::OnymouslyLiked
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordViews {
    pub post_ids: Vec<String>,
}

/// POST /api/posts
pub async fn create_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CreatePost>,
) -> Result<impl IntoResponse, AppError> {
    let post = state
        .managers
        .post
        .add_post(&ctx.user_id, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts/{post_id}
pub async fn get_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<PostView>, AppError> {
    let post = state
        .managers
        .post
        .get_post(&post_id)
        .await?
        .ok_or_else(|| ManagerError::from(PostError::DoesNotExist(post_id)))?;
    let viewed_status = state
        .managers
        .view
        .get_viewed_status(&post, &ctx.user_id)
        .await?;
    Ok(Json(PostView {
        post,
        viewed_status,
    }))
}

/// Edit text and settings (PATCH /api/posts/{post_id}).
pub async fn update_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(details): Json<PostDetails>,
) -> Result<Json<Post>, AppError> {
    let post = state
        .managers
        .post
        .set_details(&post_id, &ctx.user_id, details)
        .await?;
    Ok(Json(post))
}

/// Mark an uploaded post completed (POST /api/posts/{post_id}/complete).
pub async fn complete_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let post = state.managers.post.complete_post(&post_id, &ctx.user_id).await?;
    Ok(Json(post))
}

/// POST /api/posts/{post_id}/archive
pub async fn archive_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let post = state.managers.post.archive_post(&post_id, &ctx.user_id).await?;
    Ok(Json(post))
}

/// POST /api/posts/{post_id}/restore
pub async fn restore_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let post = state.managers.post.restore_post(&post_id, &ctx.user_id).await?;
    Ok(Json(post))
}

/// DELETE /api/posts/{post_id}
pub async fn delete_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.managers.post.delete_post(&post_id, &ctx.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/posts/{post_id}/like
pub async fn like_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(payload): Json<LikePost>,
) -> Result<impl IntoResponse, AppError> {
    let like: Like = state
        .managers
        .like
        .like_post(&ctx.user_id, &post_id, payload.like_status)
        .await?;
    Ok((StatusCode::CREATED, Json(like)))
}

/// DELETE /api/posts/{post_id}/like
pub async fn dislike_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.managers.like.dislike_post(&ctx.user_id, &post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/posts/{post_id}/likes
pub async fn list_likes(
    _ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Like>>, AppError> {
    let likes = state.managers.like.list_likes_of_post(&post_id).await?;
    Ok(Json(likes))
}

/// POST /api/posts/{post_id}/flag
pub async fn flag_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let flag = state.managers.post.flag_post(&post_id, &ctx.user_id).await?;
    Ok((StatusCode::CREATED, Json(flag)))
}

/// DELETE /api/posts/{post_id}/flag
pub async fn unflag_post(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .managers
        .flag
        .unflag(&FlaggedItem::Post(post_id), &ctx.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record that the caller saw some posts (POST /api/posts/views).
pub async fn record_views(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<RecordViews>,
) -> Result<StatusCode, AppError> {
    state
        .managers
        .post
        .record_views(&ctx.user_id, &payload.post_ids, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
