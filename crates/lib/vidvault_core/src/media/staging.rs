//! Request-scoped staged files.

use std::path::Path;

use tempfile::{Builder, NamedTempFile, TempPath};

use super::extension_for;

const STAGED_PREFIX: &str = "vidvault-";

/// A temporary local copy of an uploaded (or derived) binary.
///
/// The file is removed when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    media_type: String,
    len: u64,
}

impl StagedFile {
    /// Create an empty, uniquely named staged file in `dir`.
    pub fn reserve(dir: &Path, media_type: impl Into<String>) -> std::io::Result<Self> {
        let media_type = media_type.into();
        let file = named_in(dir, &media_type)?;
        Ok(Self {
            path: file.into_temp_path(),
            media_type,
            len: 0,
        })
    }

    pub(crate) fn from_parts(path: TempPath, media_type: String, len: u64) -> Self {
        Self {
            path,
            media_type,
            len,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn extension(&self) -> &str {
        extension_for(&self.media_type)
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Re-read the size from disk after an external writer filled the file.
    pub async fn refresh_len(&mut self) -> std::io::Result<u64> {
        self.len = tokio::fs::metadata(&*self.path).await?.len();
        Ok(self.len)
    }
}

/// Create a uniquely named temp file in `dir` carrying the media type's
/// extension. Caller-supplied filenames are never used.
pub(crate) fn named_in(dir: &Path, media_type: &str) -> std::io::Result<NamedTempFile> {
    Builder::new()
        .prefix(STAGED_PREFIX)
        .suffix(&format!(".{}", extension_for(media_type)))
        .tempfile_in(dir)
}
