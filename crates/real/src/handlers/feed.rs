use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use real_core::model::Post;

use crate::{context::RequestContext, handlers::AppError, state::AppState};

/// Largest page the feed endpoint returns.
const MAX_FEED_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
}

/// The caller's feed, newest first (GET /api/feed).
pub async fn get_feed(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    let limit = query.limit.unwrap_or(MAX_FEED_LIMIT).min(MAX_FEED_LIMIT);
    let posts = state.managers.feed.get_feed(&ctx.user_id, Some(limit)).await?;
    Ok(Json(posts))
}
