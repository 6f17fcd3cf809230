mod error;
mod fetcher;
mod normalize;
mod traits;

#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::StorageError;
pub use fetcher::{ObjectFetcher, parse_records};
pub use normalize::normalize_records;
pub use traits::{ObjectInfo, ObjectStore};
