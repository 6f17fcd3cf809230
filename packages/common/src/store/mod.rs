mod error;
mod traits;

#[cfg(feature = "sea-orm")]
pub mod database;
#[cfg(feature = "sea-orm")]
pub mod entity;

pub use error::RecordStoreError;
pub use traits::{ProcessingStats, RecordOrigin, RecordOutcome, RecordStore, StoredRecord};
