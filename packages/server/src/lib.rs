pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;

use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ingestion Admin API",
        version = "1.0.0",
        description = "Manual enqueue, peek and acknowledge operations on the ingestion queue, \
            plus read access to stored record outcomes"
    ),
    tags(
        (name = "Health", description = "Liveness and health checks"),
        (name = "Queue", description = "Enqueue, peek and delete queue messages"),
        (name = "Records", description = "Stored per-record processing outcomes"),
    ),
)]
struct ApiDoc;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes::api_routes())
        .split_for_parts();

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(TraceLayer::new_for_http())
}
