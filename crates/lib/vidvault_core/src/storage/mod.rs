//! Durable object storage for committed media.

pub mod fs;
pub mod s3;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use fs::FsObjectStore;
pub use s3::S3ObjectStore;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("upload of '{key}' failed: {detail}")]
    Put { key: String, detail: String },

    #[error("delete of '{key}' failed: {detail}")]
    Delete { key: String, detail: String },

    #[error("signing '{key}' failed: {detail}")]
    Sign { key: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An addressable store for finished media objects.
///
/// A `put` either commits the whole object under `key` or leaves nothing
/// readable there.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `source` under `key`.
    async fn put(&self, key: &str, source: &Path, content_type: &str) -> Result<(), StorageError>;

    /// Remove the object under `key`. Removing a missing object succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// A time-limited retrieval URL for `key`. Does not touch stored data.
    async fn sign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;

    /// The permanent, unsigned URL of `key`.
    fn public_url(&self, key: &str) -> String;
}

/// Reject keys that are empty, absolute or climb out of the store root.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let path = Path::new(key);
    let climbs = path.components().any(|c| {
        !matches!(c, std::path::Component::Normal(_))
    });
    if key.is_empty() || climbs {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
