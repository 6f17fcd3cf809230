use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::storage::ObjectFetcher;
use common::storage::s3::S3ObjectStore;
use common::store::RecordStore;
use common::store::database::DatabaseRecordStore;
use common::telemetry::init_tracing;
use mq::init_mq;
use tracing::{error, info, warn};
use worker::retention::spawn_retention_task;
use worker::{
    HandlerSettings, IngestionWorker, MergeProcessor, MessageHandler, StopHandle,
    WorkerAppConfig, WorkerSettings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerAppConfig::load().context("Failed to load config")?;
    init_tracing(&config.environment);

    info!("Worker starting: {}", config.worker.id);
    config.summary().log();

    if let Err(e) = config.validate() {
        error!(error = %e, "Refusing to start polling");
        return Err(e).context("Invalid configuration");
    }

    let fetcher = match config.storage.bucket_name() {
        Some(bucket) => {
            let store = S3ObjectStore::from_config(&config.storage)
                .context("Failed to initialize object storage")?;
            info!(bucket, "Object storage ready");
            Some(ObjectFetcher::new(Arc::new(store), config.storage_retry()))
        }
        None => {
            warn!("S3_BUCKET_NAME not set, s3_file messages will be left for redelivery");
            None
        }
    };

    let store: Arc<dyn RecordStore> = Arc::new(
        DatabaseRecordStore::connect(&config.database.url, config.database.max_connections)
            .await
            .context("Failed to connect to database")?,
    );
    info!("Record store connected");

    let queue = Arc::new(
        init_mq(&config.mq_config())
            .await
            .context("Failed to initialize MQ")?,
    );

    let work_delay = Duration::from_millis(config.worker.work_delay_ms);
    let handler = Arc::new(MessageHandler::new(
        fetcher,
        Arc::clone(&store),
        Arc::new(MergeProcessor::new(work_delay)),
        HandlerSettings {
            record_concurrency: config.worker.record_concurrency,
            work_delay,
            visibility_timeout: config.visibility_timeout(),
        },
    ));

    let retention = config.worker.retention_days.map(|days| {
        info!(
            days,
            interval_secs = config.worker.retention_interval_secs,
            "Retention pruning enabled"
        );
        spawn_retention_task(
            Arc::clone(&store),
            days,
            Duration::from_secs(config.worker.retention_interval_secs.max(1)),
        )
    });

    let worker = IngestionWorker::new(
        config.worker.id.clone(),
        queue,
        handler,
        WorkerSettings {
            receive: config.receive_options(),
            empty_poll_delay: Duration::from_millis(config.worker.empty_poll_delay_ms),
            error_backoff: Duration::from_millis(config.worker.error_backoff_ms),
            serialize_message_groups: config.worker.serialize_message_groups,
        },
    );

    spawn_signal_handlers(worker.stop_handle());
    worker.run().await;

    if let Some(handle) = retention {
        handle.abort();
    }

    Ok(())
}

fn spawn_signal_handlers(stop: StopHandle) {
    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, finishing current batch");
                ctrl_c_stop.stop();
            }
            Err(err) => error!("Error setting up signal handler: {}", err),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, finishing current batch");
                stop.stop();
            }
            Err(err) => error!("Error setting up SIGTERM handler: {}", err),
        }
    });
}
