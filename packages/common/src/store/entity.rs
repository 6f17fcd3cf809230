pub mod processed_record {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    use crate::RecordStatus;

    /// One outcome document per processed record.
    #[sea_orm::model]
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "processed_record")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        /// Object-storage key, or `direct_message` / `legacy_message`.
        pub source_key: String,

        pub message_id: String,

        pub record_index: i64,

        #[sea_orm(column_type = "JsonBinary")]
        pub original_data: serde_json::Value,

        /// NULL when the processor failed.
        #[sea_orm(column_type = "JsonBinary", nullable)]
        pub processed_data: Option<serde_json::Value>,

        pub processing_timestamp: DateTimeUtc,

        pub status: RecordStatus,

        #[sea_orm(column_type = "Text", nullable)]
        pub error_message: Option<String>,

        pub processing_time_ms: i64,

        pub created_at: DateTimeUtc,

        pub updated_at: DateTimeUtc,
    }

    impl ActiveModelBehavior for ActiveModel {}
}
