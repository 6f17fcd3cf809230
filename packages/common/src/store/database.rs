use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Index, IndexOrder, PostgresQueryBuilder};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{info, warn};

use super::entity::processed_record;
use super::error::RecordStoreError;
use super::traits::{ProcessingStats, RecordOutcome, RecordStore, StoredRecord};
use crate::RecordStatus;

/// Connect, sync the schema and make sure the query indexes exist.
pub async fn init_db(db_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("common::store::entity::*")
        .sync(&db)
        .await?;
    ensure_indexes(&db).await?;

    Ok(db)
}

/// Create the lookup indexes schema-sync cannot express.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        (
            "idx_processed_record_source_message",
            Index::create()
                .if_not_exists()
                .name("idx_processed_record_source_message")
                .table(processed_record::Entity)
                .col(processed_record::Column::SourceKey)
                .col(processed_record::Column::MessageId)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_processed_record_timestamp",
            Index::create()
                .if_not_exists()
                .name("idx_processed_record_timestamp")
                .table(processed_record::Entity)
                .col((processed_record::Column::ProcessingTimestamp, IndexOrder::Desc))
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_processed_record_status",
            Index::create()
                .if_not_exists()
                .name("idx_processed_record_status")
                .table(processed_record::Entity)
                .col(processed_record::Column::Status)
                .to_string(PostgresQueryBuilder),
        ),
    ];

    for (name, stmt) in statements {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}

impl TryFrom<processed_record::Model> for StoredRecord {
    type Error = RecordStoreError;

    fn try_from(model: processed_record::Model) -> Result<Self, Self::Error> {
        let record_index = u64::try_from(model.record_index).map_err(|_| {
            RecordStoreError::Corrupt {
                id: model.id,
                reason: format!("negative record_index {}", model.record_index),
            }
        })?;
        let processing_time_ms = u64::try_from(model.processing_time_ms).map_err(|_| {
            RecordStoreError::Corrupt {
                id: model.id,
                reason: format!("negative processing_time_ms {}", model.processing_time_ms),
            }
        })?;

        Ok(Self {
            id: model.id,
            source_key: model.source_key,
            message_id: model.message_id,
            record_index,
            original_data: model.original_data,
            processed_data: model.processed_data,
            processing_timestamp: model.processing_timestamp,
            status: model.status,
            error_message: model.error_message,
            processing_time_ms,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

fn into_records(
    models: Vec<processed_record::Model>,
) -> Result<Vec<StoredRecord>, RecordStoreError> {
    models.into_iter().map(StoredRecord::try_from).collect()
}

/// PostgreSQL-backed record store.
#[derive(Clone)]
pub struct DatabaseRecordStore {
    db: DatabaseConnection,
}

impl DatabaseRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self, RecordStoreError> {
        Ok(Self::new(init_db(db_url, max_connections).await?))
    }
}

#[async_trait]
impl RecordStore for DatabaseRecordStore {
    async fn save(&self, outcome: RecordOutcome) -> Result<StoredRecord, RecordStoreError> {
        let now = Utc::now();
        let origin = outcome.origin();
        let record_index = i64::try_from(origin.record_index)
            .map_err(|_| RecordStoreError::Database("record index out of range".into()))?;
        let elapsed_ms = i64::try_from(outcome.processing_time_ms()).unwrap_or(i64::MAX);

        let model = processed_record::ActiveModel {
            source_key: Set(origin.source_key.clone()),
            message_id: Set(origin.message_id.clone()),
            record_index: Set(record_index),
            original_data: Set(outcome.original_data().clone()),
            processed_data: Set(outcome.processed_data().cloned()),
            processing_timestamp: Set(outcome.processing_timestamp()),
            status: Set(outcome.status()),
            error_message: Set(outcome.error_message().map(str::to_string)),
            processing_time_ms: Set(elapsed_ms),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await?;
        inserted.try_into()
    }

    async fn find_by_source_key(
        &self,
        source_key: &str,
    ) -> Result<Vec<StoredRecord>, RecordStoreError> {
        let models = processed_record::Entity::find()
            .filter(processed_record::Column::SourceKey.eq(source_key))
            .order_by_asc(processed_record::Column::RecordIndex)
            .order_by_asc(processed_record::Column::Id)
            .all(&self.db)
            .await?;
        into_records(models)
    }

    async fn find_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Vec<StoredRecord>, RecordStoreError> {
        let models = processed_record::Entity::find()
            .filter(processed_record::Column::MessageId.eq(message_id))
            .order_by_asc(processed_record::Column::RecordIndex)
            .order_by_asc(processed_record::Column::Id)
            .all(&self.db)
            .await?;
        into_records(models)
    }

    async fn stats(&self) -> Result<ProcessingStats, RecordStoreError> {
        let rows: Vec<(String, i64, i64)> = processed_record::Entity::find()
            .select_only()
            .column(processed_record::Column::Status)
            .column_as(Expr::cust("COUNT(*)"), "count")
            .column_as(
                Expr::cust("COALESCE(SUM(\"processing_time_ms\"), 0)::BIGINT"),
                "time_ms",
            )
            .group_by(processed_record::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut successes = 0u64;
        let mut errors = 0u64;
        let mut total_time_ms = 0u64;

        for (status, count, time_ms) in rows {
            let count = u64::try_from(count).unwrap_or_default();
            match status.parse::<RecordStatus>() {
                Ok(RecordStatus::Success) => successes += count,
                Ok(RecordStatus::Error) => errors += count,
                Err(e) => {
                    warn!(error = %e, "Skipping documents with unknown status");
                    continue;
                }
            }
            total_time_ms += u64::try_from(time_ms).unwrap_or_default();
        }

        Ok(ProcessingStats::from_counts(successes, errors, total_time_ms))
    }

    async fn recent(&self, limit: u64) -> Result<Vec<StoredRecord>, RecordStoreError> {
        let models = processed_record::Entity::find()
            .order_by_desc(processed_record::Column::ProcessingTimestamp)
            .order_by_desc(processed_record::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        into_records(models)
    }

    async fn prune_older_than(&self, days: u32) -> Result<u64, RecordStoreError> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        let result = processed_record::Entity::delete_many()
            .filter(processed_record::Column::ProcessingTimestamp.lt(cutoff))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
