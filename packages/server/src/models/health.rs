use serde::Serialize;

pub const LIVENESS_MESSAGE: &str = "FC Ingestion Service is running!";

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: &'static str,
    #[schema(example = "2025-09-01T08:00:00.000Z")]
    pub timestamp: String,
    #[schema(example = "https://sqs.eu-west-1.amazonaws.com/123456789012/ingest.fifo")]
    pub queue_url: String,
}
