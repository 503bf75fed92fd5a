//! User profile handlers.
//!
//! The caller is always the `x-real-user-id` user; the identity layer has
//! already created the account id.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use real_core::model::{DatingStatus, Post, PostStatus, User, UserError, UserPrivacyStatus};

use crate::{
    context::RequestContext,
    handlers::AppError,
    managers::{ManagerError, UserDetails},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub username: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPrivacyStatus {
    pub privacy_status: UserPrivacyStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDatingStatus {
    pub dating_status: DatingStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub status: Option<PostStatus>,
}

/// Create the caller's user (POST /api/users).
pub async fn create_user(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(request_id = %ctx.request_id, user_id = %ctx.user_id, username = %payload.username, "Creating user");
    let user = state
        .managers
        .user
        .create_user(&ctx.user_id, &payload.username, payload.full_name)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get a user by id (GET /api/users/{user_id}).
pub async fn get_user(
    _ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = state
        .managers
        .user
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ManagerError::from(UserError::DoesNotExist(user_id)))?;
    Ok(Json(user))
}

/// Get the caller (GET /api/users/self).
pub async fn get_self(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    get_user(ctx.clone(), State(state), Path(ctx.user_id)).await
}

/// Edit the caller's profile (PATCH /api/users/self).
pub async fn update_details(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(details): Json<UserDetails>,
) -> Result<Json<User>, AppError> {
    let user = state.managers.user.update_details(&ctx.user_id, details).await?;
    Ok(Json(user))
}

/// PUT /api/users/self/privacy
pub async fn set_privacy_status(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<SetPrivacyStatus>,
) -> Result<Json<User>, AppError> {
    let user = state
        .managers
        .user
        .set_privacy_status(&ctx.user_id, payload.privacy_status)
        .await?;
    Ok(Json(user))
}

/// PUT /api/users/self/dating
pub async fn set_dating_status(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<SetDatingStatus>,
) -> Result<Json<User>, AppError> {
    let user = state
        .managers
        .user
        .set_dating_status(&ctx.user_id, payload.dating_status)
        .await?;
    Ok(Json(user))
}

/// Delete the caller and everything they own (DELETE /api/users/self).
pub async fn delete_user(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let user = state.managers.user.delete_user(&ctx.user_id).await?;
    Ok(Json(user))
}

/// List a user's posts (GET /api/users/{user_id}/posts).
///
/// Only the owner sees posts other than completed ones.
pub async fn list_posts(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    let status = if ctx.user_id == user_id {
        query.status
    } else {
        Some(PostStatus::Completed)
    };
    let posts = state.managers.post.list_posts(&user_id, status).await?;
    Ok(Json(posts))
}
