//! Object store on Amazon S3 (or an S3-compatible endpoint).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use super::{ObjectStore, StorageError, validate_key};

/// S3 bucket-backed [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    region: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, source: &Path, content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::Put {
                key: key.to_string(),
                detail: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Put {
                key: key.to_string(),
                detail: DisplayErrorContext(&e).to_string(),
            })?;

        debug!(bucket = %self.bucket, key, "object stored in s3");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                detail: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }

    async fn sign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        validate_key(key)?;
        let presigning = PresigningConfig::expires_in(ttl).map_err(|e| StorageError::Sign {
            key: key.to_string(),
            detail: e.to_string(),
        })?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Sign {
                key: key.to_string(),
                detail: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(request.uri().to_string())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }
}
