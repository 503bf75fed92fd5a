//! Card handlers, including the SSE stream of card notifications.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio::sync::broadcast::error::RecvError;

use real_core::model::Card;

use crate::{context::RequestContext, handlers::AppError, state::AppState};

/// The caller's cards, newest first (GET /api/cards).
pub async fn list_cards(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<Card>>, AppError> {
    let cards = state.managers.card.list_cards(&ctx.user_id).await?;
    Ok(Json(cards))
}

/// Dismiss a card (DELETE /api/cards/{card_id}).
pub async fn delete_card(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.managers.card.delete_card(&card_id, &ctx.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// SSE endpoint for the caller's card notifications (GET /api/cards/events).
///
/// Each event is named after the notification type (`ADDED`, `EDITED`,
/// `DELETED`) and carries the card as JSON.
pub async fn card_events_sse(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let user_id = ctx.user_id;
    let mut receiver = state.card_notifier.subscribe(&user_id).await;
    let mut shutdown_rx = state.subscribe_shutdown();

    let stream = async_stream::stream! {
        tracing::debug!(%user_id, "Card stream opened");
        loop {
            tokio::select! {
                result = receiver.recv() => {
                    match result {
                        Ok(event) => {
                            let data = serde_json::to_string(&event.card).unwrap_or_default();
                            yield Ok(Event::default()
                                .id(event.card.card_id.clone())
                                .event(event.kind.as_str())
                                .data(data));
                        }
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(%user_id, lagged = n, "Card stream lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(%user_id, "Card stream received shutdown signal");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
