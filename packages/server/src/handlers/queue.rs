use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use common::ingestion::{ADMIN_SOURCE, IngestionMessage};
use common::timestamp::now_rfc3339_millis;
use mq::is_fifo_queue;
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::queue::*;
use crate::state::AppState;

/// Enqueue an arbitrary JSON payload.
#[utoipa::path(
    post,
    path = "/ingest",
    tag = "Queue",
    operation_id = "ingest",
    summary = "Enqueue a payload",
    description = "Wraps the request body in `{ id, timestamp, data, source }` and sends it to the \
        ingestion queue. The envelope has no `type`, so the worker stores it as one record. On FIFO \
        queues the message is sent in the `admin-ingest` group.",
    request_body(content = Value, description = "Any JSON value"),
    responses(
        (status = 201, description = "Message enqueued", body = IngestResponse),
        (status = 400, description = "Body is not JSON (VALIDATION_ERROR)", body = ErrorBody),
        (status = 502, description = "Queue send failed (QUEUE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, data))]
pub async fn ingest(
    State(state): State<AppState>,
    AppJson(data): AppJson<Value>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    let envelope = IngestionMessage::new(data, ADMIN_SOURCE);
    let body = serde_json::to_string(&envelope).map_err(|e| AppError::Internal(e.to_string()))?;
    let group = is_fifo_queue(state.queue.queue_url()).then_some(ADMIN_MESSAGE_GROUP);

    let message_id = state.queue.send(&body, group).await?;
    info!(message_id = %message_id, envelope_id = %envelope.id, "Message sent");

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            success: true,
            message_id,
            timestamp: now_rfc3339_millis(),
        }),
    ))
}

/// Receive up to 10 messages without acknowledging them.
#[utoipa::path(
    get,
    path = "/messages",
    tag = "Queue",
    operation_id = "listMessages",
    summary = "Peek at queued messages",
    description = "Receives up to 10 messages. They stay in flight until deleted or until the \
        visibility timeout lapses, and the receive counts toward the dead-letter threshold.",
    responses(
        (status = 200, description = "Received messages", body = MessageListResponse),
        (status = 502, description = "Queue receive failed (QUEUE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<MessageListResponse>, AppError> {
    let messages: Vec<PeekedMessage> = state
        .queue
        .receive(&state.peek)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    info!(count = messages.len(), "Received messages");

    Ok(Json(MessageListResponse {
        count: messages.len(),
        messages,
    }))
}

/// Acknowledge a message by receipt handle.
#[utoipa::path(
    delete,
    path = "/messages/{receipt_handle}",
    tag = "Queue",
    operation_id = "deleteMessage",
    summary = "Delete a message",
    params(("receipt_handle" = String, Path, description = "URL-encoded receipt handle")),
    responses(
        (status = 200, description = "Message deleted", body = DeleteMessageResponse),
        (status = 502, description = "Queue delete failed (QUEUE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip_all)]
pub async fn delete_message(
    State(state): State<AppState>,
    Path(receipt_handle): Path<String>,
) -> Result<Json<DeleteMessageResponse>, AppError> {
    if receipt_handle.trim().is_empty() {
        return Err(AppError::Validation("receipt handle must not be empty".into()));
    }

    state.queue.delete(&receipt_handle).await?;
    info!("Message deleted");

    Ok(Json(DeleteMessageResponse {
        success: true,
        message: "Message deleted successfully",
    }))
}
