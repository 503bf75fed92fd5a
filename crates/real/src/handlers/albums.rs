//! Album handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use real_core::model::{Album, AlbumError};

use crate::{
    context::RequestContext,
    handlers::AppError,
    managers::ManagerError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateAlbum {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAlbum {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// POST /api/albums
pub async fn create_album(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CreateAlbum>,
) -> Result<impl IntoResponse, AppError> {
    let album = state
        .managers
        .album
        .add_album(&ctx.user_id, &payload.name, payload.description)
        .await?;
    Ok((StatusCode::CREATED, Json(album)))
}

/// GET /api/albums/{album_id}
pub async fn get_album(
    _ctx: RequestContext,
    State(state): State<AppState>,
    Path(album_id): Path<String>,
) -> Result<Json<Album>, AppError> {
    let album = state
        .managers
        .album
        .get_album(&album_id)
        .await?
        .ok_or_else(|| ManagerError::from(AlbumError::DoesNotExist(album_id)))?;
    Ok(Json(album))
}

/// GET /api/users/{user_id}/albums
pub async fn list_albums(
    _ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Album>>, AppError> {
    let albums = state.managers.album.list_albums(&user_id).await?;
    Ok(Json(albums))
}

/// PATCH /api/albums/{album_id}
pub async fn update_album(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(album_id): Path<String>,
    Json(payload): Json<UpdateAlbum>,
) -> Result<Json<Album>, AppError> {
    let album = state
        .managers
        .album
        .update_album(
            &album_id,
            &ctx.user_id,
            payload.name.as_deref(),
            payload.description,
        )
        .await?;
    Ok(Json(album))
}

/// DELETE /api/albums/{album_id}
pub async fn delete_album(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(album_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .managers
        .album
        .delete_album(&album_id, &ctx.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
