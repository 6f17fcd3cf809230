use std::sync::Arc;
use std::time::Duration;

use common::store::{RecordStore, RecordStoreError};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Delete outcome documents older than `days` days once.
pub async fn prune_once(store: &dyn RecordStore, days: u32) -> Result<u64, RecordStoreError> {
    let removed = store.prune_older_than(days).await?;
    if removed > 0 {
        info!(removed, days, "Pruned old outcome documents");
    }
    Ok(removed)
}

/// Prune every `interval`, starting immediately. Failures are logged and
/// retried on the next tick.
pub fn spawn_retention_task(
    store: Arc<dyn RecordStore>,
    days: u32,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            if let Err(e) = prune_once(store.as_ref(), days).await {
                error!(error = %e, days, "Failed to prune outcome documents");
            }
        }
    })
}
