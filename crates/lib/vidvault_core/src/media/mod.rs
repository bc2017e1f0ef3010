//! Media handling: upload staging, container inspection and faststart remux.
//!
//! The external tools (`ffprobe`, `ffmpeg`) sit behind the [`MediaInspector`]
//! and [`MediaStager`] traits so the ingestion pipeline never depends on how
//! they are invoked.

pub mod intake;
pub mod keys;
pub mod probe;
pub mod remux;
pub mod staging;
mod tool;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub use intake::{MediaIntake, UploadPart};
pub use probe::{FfprobeInspector, MediaInspector, ProbeReport};
pub use remux::{FfmpegStager, MediaStager};
pub use staging::StagedFile;

/// Media types accepted for thumbnails.
pub const THUMBNAIL_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// Media types accepted for video bodies.
pub const VIDEO_MEDIA_TYPES: &[&str] = &["video/mp4"];

/// Media errors.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("missing form field '{0}'")]
    MissingField(String),

    #[error("unsupported media type '{0}'")]
    UnsupportedType(String),

    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("malformed upload: {0}")]
    Malformed(String),

    #[error("{tool} failed: {detail}")]
    Tool { tool: &'static str, detail: String },

    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: &'static str, after: Duration },

    #[error("unreadable probe report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Whether the error is the caller's fault (bad request) rather than a
    /// dependency failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            MediaError::MissingField(_)
                | MediaError::UnsupportedType(_)
                | MediaError::TooLarge { .. }
                | MediaError::Malformed(_)
        )
    }
}

/// Aspect classification of a video, used as its storage key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    /// Classify a display aspect ratio string. Only exact `16:9` and `9:16`
    /// are recognised; anything else, including no ratio, is `Other`.
    pub fn from_ratio(ratio: Option<&str>) -> Self {
        match ratio {
            Some("16:9") => AspectClass::Landscape,
            Some("9:16") => AspectClass::Portrait,
            _ => AspectClass::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a `Content-Type` value down to its lowercase `type/subtype`.
///
/// Returns `None` when the value has no `/`.
pub fn parse_media_type(raw: &str) -> Option<String> {
    let essence = raw.split(';').next()?.trim().to_ascii_lowercase();
    let (kind, subtype) = essence.split_once('/')?;
    if kind.is_empty() || subtype.is_empty() {
        return None;
    }
    Some(essence)
}

/// File extension for a parsed media type (its subtype).
pub fn extension_for(media_type: &str) -> &str {
    media_type
        .split_once('/')
        .map(|(_, subtype)| subtype)
        .unwrap_or("bin")
}
