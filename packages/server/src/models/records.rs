use common::store::StoredRecord;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RECENT_LIMIT: u64 = 10;
pub const MAX_RECENT_LIMIT: u64 = 100;

/// Query parameters for the most recent outcome documents.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct RecentParams {
    /// Number of documents (1-100, default 10).
    #[param(example = 10)]
    pub limit: Option<u64>,
}

impl RecentParams {
    pub fn limit(&self) -> Result<u64, String> {
        match self.limit {
            None => Ok(DEFAULT_RECENT_LIMIT),
            Some(n) if (1..=MAX_RECENT_LIMIT).contains(&n) => Ok(n),
            Some(_) => Err(format!("limit must be between 1 and {MAX_RECENT_LIMIT}")),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct BySourceParams {
    /// Object key, or `direct_message` / `legacy_message`.
    #[param(example = "incoming/batch-42.json")]
    pub key: String,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PruneParams {
    /// Delete documents processed more than this many days ago.
    #[param(example = 30)]
    pub older_than_days: u32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecordListResponse {
    #[schema(example = 2)]
    pub count: usize,
    pub data: Vec<StoredRecord>,
}

impl From<Vec<StoredRecord>> for RecordListResponse {
    fn from(data: Vec<StoredRecord>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PruneResponse {
    #[schema(example = 12)]
    pub deleted: u64,
    #[schema(example = 30)]
    pub older_than_days: u32,
}
