//! Ingest endpoint for the table's change stream.
//!
//! The stream consumer forwards each batch of DynamoDB stream records here;
//! every record is dispatched to the manager hooks before the response.

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;

use crate::{handlers::AppError, state::AppState, storage::dynamodb::parse_stream_event};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamAck {
    pub dispatched: usize,
}

/// POST /internal/stream - Dispatch a batch of stream records.
#[axum::debug_handler]
pub async fn ingest_stream(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StreamAck>, AppError> {
    let records = parse_stream_event(&body)?;

    for record in &records {
        state.dispatcher.dispatch(record).await;
    }

    tracing::debug!(dispatched = records.len(), "Dispatched stream records");
    Ok(Json(StreamAck {
        dispatched: records.len(),
    }))
}
