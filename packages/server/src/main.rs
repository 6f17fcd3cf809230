use std::sync::Arc;

use anyhow::{Context, bail};
use common::store::RecordStore;
use common::store::database::DatabaseRecordStore;
use common::telemetry::init_tracing;
use mq::init_mq;
use server::config::AppConfig;
use server::state::AppState;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    init_tracing(&config.environment);
    config.summary().log();

    if config.queue.url.trim().is_empty() {
        error!("QUEUE_URL is not set");
        bail!("Missing required configuration: QUEUE_URL");
    }

    let queue = Arc::new(
        init_mq(&config.mq_config())
            .await
            .context("Failed to initialize MQ")?,
    );

    let records: Option<Arc<dyn RecordStore>> = match config.database_url() {
        Some(url) => {
            let store = DatabaseRecordStore::connect(url, config.database.max_connections)
                .await
                .context("Failed to connect to database")?;
            info!("Record store connected");
            Some(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, /records routes are disabled");
            None
        }
    };

    let state = AppState {
        queue,
        records,
        peek: config.peek_options(),
    };
    let app = server::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Error setting up signal handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Error setting up SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
