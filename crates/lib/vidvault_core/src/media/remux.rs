//! Faststart remux: move the index atom ahead of the media data without
//! re-encoding.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::staging::StagedFile;
use super::{MediaError, tool};

/// Rewrites a staged file for progressive playback.
///
/// Returns a new staged file; the input is left in place for its owner to
/// release.
#[async_trait]
pub trait MediaStager: Send + Sync {
    async fn remux(&self, input: &StagedFile) -> Result<StagedFile, MediaError>;
}

/// [`MediaStager`] backed by the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegStager {
    bin: PathBuf,
    timeout: Duration,
}

impl FfmpegStager {
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MediaStager for FfmpegStager {
    async fn remux(&self, input: &StagedFile) -> Result<StagedFile, MediaError> {
        let dir = input
            .path()
            .parent()
            .ok_or_else(|| std::io::Error::other("staged file has no parent directory"))?;
        let mut output = StagedFile::reserve(dir, input.media_type())?;

        let args: [&OsStr; 12] = [
            "-y".as_ref(),
            "-v".as_ref(),
            "error".as_ref(),
            "-i".as_ref(),
            input.path().as_os_str(),
            "-c".as_ref(),
            "copy".as_ref(),
            "-movflags".as_ref(),
            "faststart".as_ref(),
            "-f".as_ref(),
            "mp4".as_ref(),
            output.path().as_os_str(),
        ];
        tool::run("ffmpeg", &self.bin, args, self.timeout).await?;

        let len = output.refresh_len().await?;
        if len == 0 {
            return Err(MediaError::Tool {
                tool: "ffmpeg",
                detail: "produced an empty file".into(),
            });
        }
        debug!(input = %input.path().display(), output = %output.path().display(), bytes = len, "remuxed");
        Ok(output)
    }
}
