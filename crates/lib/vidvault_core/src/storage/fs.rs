//! Object store on the local filesystem, served under a public base URL.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ObjectStore, StorageError, validate_key};

/// Stores objects as files below `root`; `public_base` is the URL `root` is
/// served at.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    public_base: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, source: &Path, _content_type: &str) -> Result<(), StorageError> {
        let dest = self.object_path(key)?;
        let parent = dest
            .parent()
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        tokio::fs::create_dir_all(parent).await?;

        // Copy under a hidden name, then rename into place.
        let file_name = dest
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        let partial = parent.join(format!(".{file_name}.partial"));

        if let Err(e) = tokio::fs::copy(source, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(StorageError::Put {
                key: key.to_string(),
                detail: e.to_string(),
            });
        }
        if let Err(e) = tokio::fs::rename(&partial, &dest).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(StorageError::Put {
                key: key.to_string(),
                detail: e.to_string(),
            });
        }

        debug!(key, path = %dest.display(), "object stored on filesystem");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete {
                key: key.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    /// Files served from a directory cannot expire; the public URL is
    /// returned unchanged.
    async fn sign_get(&self, key: &str, _ttl: Duration) -> Result<String, StorageError> {
        validate_key(key)?;
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base.trim_end_matches('/'), key)
    }
}
