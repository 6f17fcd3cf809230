use axum::{
    Json,
    extract::{Path, Query, State},
};
use common::store::ProcessingStats;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::models::records::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/records/stats",
    tag = "Records",
    operation_id = "getRecordStats",
    summary = "Outcome statistics",
    description = "Totals per status and the average processing time over all outcome documents.",
    responses(
        (status = 200, description = "Statistics", body = ProcessingStats),
        (status = 503, description = "No record store (RECORDS_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn record_stats(
    State(state): State<AppState>,
) -> Result<Json<ProcessingStats>, AppError> {
    Ok(Json(state.records()?.stats().await?))
}

#[utoipa::path(
    get,
    path = "/records/recent",
    tag = "Records",
    operation_id = "listRecentRecords",
    summary = "Most recent outcome documents",
    params(RecentParams),
    responses(
        (status = 200, description = "Documents, newest first", body = RecordListResponse),
        (status = 400, description = "Limit out of range (VALIDATION_ERROR)", body = ErrorBody),
        (status = 503, description = "No record store (RECORDS_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn recent_records(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<RecordListResponse>, AppError> {
    let limit = params.limit().map_err(AppError::Validation)?;
    let records = state.records()?.recent(limit).await?;
    Ok(Json(records.into()))
}

#[utoipa::path(
    get,
    path = "/records/by-message/{message_id}",
    tag = "Records",
    operation_id = "listRecordsByMessage",
    summary = "Outcome documents of one queue message",
    params(("message_id" = String, Path, description = "Queue message id")),
    responses(
        (status = 200, description = "Documents ordered by record index", body = RecordListResponse),
        (status = 404, description = "No documents for this message (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "No record store (RECORDS_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn records_by_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<RecordListResponse>, AppError> {
    let records = state.records()?.find_by_message_id(&message_id).await?;
    if records.is_empty() {
        return Err(AppError::NotFound(format!(
            "No records for message {message_id}"
        )));
    }
    Ok(Json(records.into()))
}

#[utoipa::path(
    get,
    path = "/records/by-source",
    tag = "Records",
    operation_id = "listRecordsBySource",
    summary = "Outcome documents of one source",
    params(BySourceParams),
    responses(
        (status = 200, description = "Documents ordered by record index", body = RecordListResponse),
        (status = 400, description = "Empty key (VALIDATION_ERROR)", body = ErrorBody),
        (status = 503, description = "No record store (RECORDS_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn records_by_source(
    State(state): State<AppState>,
    Query(params): Query<BySourceParams>,
) -> Result<Json<RecordListResponse>, AppError> {
    if params.key.trim().is_empty() {
        return Err(AppError::Validation("key must not be empty".into()));
    }
    let records = state.records()?.find_by_source_key(&params.key).await?;
    Ok(Json(records.into()))
}

#[utoipa::path(
    delete,
    path = "/records",
    tag = "Records",
    operation_id = "pruneRecords",
    summary = "Delete old outcome documents",
    params(PruneParams),
    responses(
        (status = 200, description = "Number of deleted documents", body = PruneResponse),
        (status = 400, description = "older_than_days is zero (VALIDATION_ERROR)", body = ErrorBody),
        (status = 503, description = "No record store (RECORDS_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn prune_records(
    State(state): State<AppState>,
    Query(params): Query<PruneParams>,
) -> Result<Json<PruneResponse>, AppError> {
    if params.older_than_days == 0 {
        return Err(AppError::Validation(
            "older_than_days must be at least 1".into(),
        ));
    }
    let deleted = state
        .records()?
        .prune_older_than(params.older_than_days)
        .await?;
    info!(deleted, older_than_days = params.older_than_days, "Pruned records");

    Ok(Json(PruneResponse {
        deleted,
        older_than_days: params.older_than_days,
    }))
}
