//! Container inspection.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{AspectClass, MediaError, tool};

/// Metadata extracted from a staged file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Display aspect ratio of the first stream, e.g. `"16:9"`.
    pub display_aspect_ratio: Option<String>,
}

impl ProbeReport {
    pub fn aspect_class(&self) -> AspectClass {
        AspectClass::from_ratio(self.display_aspect_ratio.as_deref())
    }
}

/// Extracts container/stream metadata from a local file.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, MediaError>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    display_aspect_ratio: Option<String>,
}

/// Parse `ffprobe -print_format json -show_streams` output.
///
/// A report with no streams, or whose first stream has no ratio, parses to a
/// report without a ratio.
pub fn parse_report(stdout: &[u8]) -> Result<ProbeReport, MediaError> {
    let output: FfprobeOutput = serde_json::from_slice(stdout)?;
    Ok(ProbeReport {
        display_aspect_ratio: output
            .streams
            .into_iter()
            .next()
            .and_then(|s| s.display_aspect_ratio),
    })
}

/// [`MediaInspector`] backed by the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeInspector {
    bin: PathBuf,
    timeout: Duration,
}

impl FfprobeInspector {
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MediaInspector for FfprobeInspector {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, MediaError> {
        let args: [&OsStr; 6] = [
            "-v".as_ref(),
            "error".as_ref(),
            "-print_format".as_ref(),
            "json".as_ref(),
            "-show_streams".as_ref(),
            path.as_os_str(),
        ];
        let output = tool::run("ffprobe", &self.bin, args, self.timeout).await?;

        let report = parse_report(&output.stdout)?;
        debug!(path = %path.display(), ratio = ?report.display_aspect_ratio, "probed");
        Ok(report)
    }
}
