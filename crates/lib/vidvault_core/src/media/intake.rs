//! Upload intake: bounded streaming of a multipart part into a staged file.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::{Stream, StreamExt, pin_mut};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::staging::{StagedFile, named_in};
use super::{MediaError, parse_media_type};

/// One uploaded part: its declared content type and its byte stream.
pub struct UploadPart<S> {
    pub content_type: Option<String>,
    pub body: S,
}

/// Receives uploads into a staging directory under a hard byte ceiling.
#[derive(Debug, Clone)]
pub struct MediaIntake {
    staging_dir: PathBuf,
    max_bytes: u64,
}

impl MediaIntake {
    pub fn new(staging_dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Reject a request whose declared body length already exceeds the
    /// ceiling, before anything is read.
    pub fn admit(&self, declared_len: Option<u64>) -> Result<(), MediaError> {
        match declared_len {
            Some(len) if len > self.max_bytes => Err(MediaError::TooLarge {
                limit: self.max_bytes,
            }),
            _ => Ok(()),
        }
    }

    /// Stream `part` into a new staged file.
    ///
    /// The content type is checked against `allowed` before the staging file
    /// is created. The byte count is enforced while streaming; on any error
    /// the partial file is removed.
    pub async fn receive<S, E>(
        &self,
        part: UploadPart<S>,
        allowed: &[&str],
    ) -> Result<StagedFile, MediaError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let declared = part.content_type.unwrap_or_default();
        let media_type = parse_media_type(&declared)
            .filter(|mt| allowed.contains(&mt.as_str()))
            .ok_or_else(|| MediaError::UnsupportedType(declared.clone()))?;

        let (std_file, path) = named_in(&self.staging_dir, &media_type)?.into_parts();
        let mut writer = BufWriter::new(File::from_std(std_file));

        let body = part.body;
        pin_mut!(body);

        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                let err: Box<dyn StdError + Send + Sync> = e.into();
                MediaError::Malformed(err.to_string())
            })?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(MediaError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        if written == 0 {
            return Err(MediaError::Malformed("empty upload".into()));
        }

        debug!(path = %path.display(), bytes = written, %media_type, "upload staged");
        Ok(StagedFile::from_parts(path, media_type, written))
    }
}
