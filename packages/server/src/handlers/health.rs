use axum::{Json, extract::State};
use common::timestamp::now_rfc3339_millis;

use crate::models::health::{HealthResponse, LIVENESS_MESSAGE};
use crate::state::AppState;

/// Liveness string.
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    operation_id = "liveness",
    summary = "Liveness probe",
    responses(
        (status = 200, description = "Service is running", body = String, content_type = "text/plain"),
    ),
)]
pub async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "health",
    summary = "Health check",
    description = "Reports the service as healthy together with the queue it is bound to.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: now_rfc3339_millis(),
        queue_url: state.queue.queue_url().to_string(),
    })
}
