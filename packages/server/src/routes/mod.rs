use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(health_routes())
        .merge(queue_routes())
        .merge(record_routes())
}

fn health_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::health::liveness))
        .routes(routes!(handlers::health::health))
}

fn queue_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::queue::ingest))
        .routes(routes!(handlers::queue::list_messages))
        .routes(routes!(handlers::queue::delete_message))
}

fn record_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::records::prune_records))
        .routes(routes!(handlers::records::record_stats))
        .routes(routes!(handlers::records::recent_records))
        .routes(routes!(handlers::records::records_by_message))
        .routes(routes!(handlers::records::records_by_source))
}
