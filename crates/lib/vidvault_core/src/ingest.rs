//! Upload ingestion: ownership check, staging, inspection, faststart remux,
//! object upload and the final record update, in that order.
//!
//! Every upload walks the stages of [`IngestStage`]. A failure at any stage
//! is terminal; staged files are released on every exit path and the video
//! record keeps its previous URL unless the whole pipeline succeeded.

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::Stream;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::media::{
    MediaError, MediaInspector, MediaIntake, MediaStager, StagedFile, THUMBNAIL_MEDIA_TYPES,
    UploadPart, VIDEO_MEDIA_TYPES, keys,
};
use crate::models::video::Video;
use crate::storage::{ObjectStore, StorageError};
use crate::videos::{self, MediaUrlField};

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Authenticated,
    Staged,
    Inspected,
    Remuxed,
    Stored,
    Persisted,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IngestStage::Authenticated => "authenticated",
            IngestStage::Staged => "staged",
            IngestStage::Inspected => "inspected",
            IngestStage::Remuxed => "remuxed",
            IngestStage::Stored => "stored",
            IngestStage::Persisted => "persisted",
        })
    }
}

/// What happens when two uploads target the same field of one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Both run; the later commit wins.
    #[default]
    LastWriteWins,
    /// A second upload is refused while one is in flight, and a commit is
    /// refused if the field changed since the upload was authorized.
    Reject,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-write-wins" => Ok(ConflictPolicy::LastWriteWins),
            "reject" => Ok(ConflictPolicy::Reject),
            other => Err(format!(
                "unknown conflict policy '{other}' (expected 'last-write-wins' or 'reject')"
            )),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictPolicy::LastWriteWins => "last-write-wins",
            ConflictPolicy::Reject => "reject",
        })
    }
}

/// The two kinds of binary a video carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Video,
    Thumbnail,
}

impl UploadKind {
    /// Multipart field the binary arrives in.
    pub fn field_name(&self) -> &'static str {
        match self {
            UploadKind::Video => "video",
            UploadKind::Thumbnail => "thumbnail",
        }
    }

    pub fn allowed_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Video => VIDEO_MEDIA_TYPES,
            UploadKind::Thumbnail => THUMBNAIL_MEDIA_TYPES,
        }
    }

    pub fn url_field(&self) -> MediaUrlField {
        match self {
            UploadKind::Video => MediaUrlField::Video,
            UploadKind::Thumbnail => MediaUrlField::Thumbnail,
        }
    }
}

/// Settings for [`IngestionOrchestrator`].
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub staging_dir: PathBuf,
    pub max_video_bytes: u64,
    pub max_thumbnail_bytes: u64,
    pub policy: ConflictPolicy,
}

/// The failure underneath a stage-tagged [`IngestError`].
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Ingestion errors.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("video not found")]
    VideoNotFound,

    #[error("caller does not own the video")]
    NotOwner,

    #[error("another upload to video {0} is in progress")]
    Conflict(Uuid),

    /// The upload itself was unacceptable (type, size, shape).
    #[error("{0}")]
    Rejected(MediaError),

    /// A dependency failed while reaching `stage`.
    #[error("ingestion failed at stage '{stage}': {source}")]
    Stage {
        stage: IngestStage,
        #[source]
        source: StageError,
    },
}

impl IngestError {
    fn stage(stage: IngestStage, source: impl Into<StageError>) -> Self {
        IngestError::Stage {
            stage,
            source: source.into(),
        }
    }

    fn media(stage: IngestStage, err: MediaError) -> Self {
        if err.is_rejection() {
            IngestError::Rejected(err)
        } else {
            IngestError::stage(stage, err)
        }
    }
}

type InFlightSet = Arc<DashMap<(Uuid, UploadKind), ()>>;

/// Marks an upload as in flight until dropped.
#[derive(Debug)]
struct InFlight {
    set: InFlightSet,
    key: (Uuid, UploadKind),
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

/// Proof that the caller owns the target video and may send bytes.
///
/// Produced by [`IngestionOrchestrator::authorize`] before any body is read.
#[derive(Debug)]
pub struct AuthorizedUpload {
    video_id: Uuid,
    kind: UploadKind,
    previous: Option<String>,
    _in_flight: Option<InFlight>,
}

impl AuthorizedUpload {
    pub fn video_id(&self) -> Uuid {
        self.video_id
    }

    pub fn kind(&self) -> UploadKind {
        self.kind
    }
}

/// Sequences a single upload through every [`IngestStage`].
pub struct IngestionOrchestrator {
    pool: SqlitePool,
    policy: ConflictPolicy,
    video_intake: MediaIntake,
    thumbnail_intake: MediaIntake,
    inspector: Arc<dyn MediaInspector>,
    stager: Arc<dyn MediaStager>,
    video_store: Arc<dyn ObjectStore>,
    thumbnail_store: Arc<dyn ObjectStore>,
    in_flight: InFlightSet,
}

impl IngestionOrchestrator {
    pub fn new(
        pool: SqlitePool,
        config: &IngestConfig,
        inspector: Arc<dyn MediaInspector>,
        stager: Arc<dyn MediaStager>,
        video_store: Arc<dyn ObjectStore>,
        thumbnail_store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            pool,
            policy: config.policy,
            video_intake: MediaIntake::new(&config.staging_dir, config.max_video_bytes),
            thumbnail_intake: MediaIntake::new(&config.staging_dir, config.max_thumbnail_bytes),
            inspector,
            stager,
            video_store,
            thumbnail_store,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Byte ceiling for uploads of `kind`.
    pub fn max_bytes(&self, kind: UploadKind) -> u64 {
        self.intake(kind).max_bytes()
    }

    fn intake(&self, kind: UploadKind) -> &MediaIntake {
        match kind {
            UploadKind::Video => &self.video_intake,
            UploadKind::Thumbnail => &self.thumbnail_intake,
        }
    }

    fn store(&self, kind: UploadKind) -> &dyn ObjectStore {
        match kind {
            UploadKind::Video => self.video_store.as_ref(),
            UploadKind::Thumbnail => self.thumbnail_store.as_ref(),
        }
    }

    /// Confirm `user_id` owns `video_id` and the declared body fits, before
    /// any byte of the upload is read.
    pub async fn authorize(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        kind: UploadKind,
        declared_len: Option<u64>,
    ) -> Result<AuthorizedUpload, IngestError> {
        let video = videos::get_video(&self.pool, video_id)
            .await
            .map_err(|e| IngestError::stage(IngestStage::Authenticated, e))?
            .ok_or(IngestError::VideoNotFound)?;

        if video.user_id != user_id {
            warn!(%user_id, %video_id, "upload to a video owned by another user");
            return Err(IngestError::NotOwner);
        }

        let in_flight = match self.policy {
            ConflictPolicy::LastWriteWins => None,
            ConflictPolicy::Reject => match self.in_flight.entry((video_id, kind)) {
                Entry::Occupied(_) => return Err(IngestError::Conflict(video_id)),
                Entry::Vacant(slot) => {
                    slot.insert(());
                    Some(InFlight {
                        set: Arc::clone(&self.in_flight),
                        key: (video_id, kind),
                    })
                }
            },
        };

        self.intake(kind)
            .admit(declared_len)
            .map_err(IngestError::Rejected)?;

        debug!(%user_id, %video_id, stage = %IngestStage::Authenticated, kind = kind.field_name(), "upload authorized");
        Ok(AuthorizedUpload {
            video_id,
            kind,
            previous: kind.url_field().current(&video).map(str::to_string),
            _in_flight: in_flight,
        })
    }

    /// Run the remaining stages for an authorized upload and return the
    /// updated video record.
    pub async fn ingest<S, E>(
        &self,
        upload: AuthorizedUpload,
        part: UploadPart<S>,
    ) -> Result<Video, IngestError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let video_id = upload.video_id;
        let kind = upload.kind;

        let staged = self
            .intake(kind)
            .receive(part, kind.allowed_types())
            .await
            .map_err(|e| IngestError::media(IngestStage::Staged, e))?;
        debug!(%video_id, stage = %IngestStage::Staged, bytes = staged.len(), "upload staged");

        let (key, value) = match kind {
            UploadKind::Video => {
                let key = self.store_video(video_id, &staged).await?;
                (key.clone(), key)
            }
            UploadKind::Thumbnail => {
                let key = keys::object_key(None, staged.extension());
                self.put(video_id, kind, &key, &staged).await?;
                let url = self.thumbnail_store.public_url(&key);
                (key, url)
            }
        };

        let video = self.commit(&upload, &key, &value).await?;
        info!(%video_id, stage = %IngestStage::Persisted, kind = kind.field_name(), %key, "upload committed");
        Ok(video)
    }

    /// Inspect, remux and store a staged video. Returns the object key.
    async fn store_video(&self, video_id: Uuid, staged: &StagedFile) -> Result<String, IngestError> {
        let report = self
            .inspector
            .probe(staged.path())
            .await
            .map_err(|e| IngestError::stage(IngestStage::Inspected, e))?;
        let aspect = report.aspect_class();
        debug!(%video_id, stage = %IngestStage::Inspected, %aspect, "video inspected");

        let remuxed = self
            .stager
            .remux(staged)
            .await
            .map_err(|e| IngestError::stage(IngestStage::Remuxed, e))?;
        debug!(%video_id, stage = %IngestStage::Remuxed, bytes = remuxed.len(), "video remuxed");

        let key = keys::object_key(Some(aspect.as_str()), remuxed.extension());
        self.put(video_id, UploadKind::Video, &key, &remuxed).await?;
        Ok(key)
    }

    async fn put(
        &self,
        video_id: Uuid,
        kind: UploadKind,
        key: &str,
        file: &StagedFile,
    ) -> Result<(), IngestError> {
        self.store(kind)
            .put(key, file.path(), file.media_type())
            .await
            .map_err(|e| IngestError::stage(IngestStage::Stored, e))?;
        debug!(%video_id, stage = %IngestStage::Stored, key, "object stored");
        Ok(())
    }

    /// Point the record at the stored object. On failure the new object is
    /// removed again.
    async fn commit(
        &self,
        upload: &AuthorizedUpload,
        key: &str,
        value: &str,
    ) -> Result<Video, IngestError> {
        let expected = match self.policy {
            ConflictPolicy::LastWriteWins => None,
            ConflictPolicy::Reject => Some(upload.previous.as_deref()),
        };

        let outcome = videos::set_media_url(
            &self.pool,
            upload.video_id,
            upload.kind.url_field(),
            value,
            expected,
        )
        .await;

        let err = match outcome {
            Ok(Some(video)) => return Ok(video),
            Ok(None) => match videos::get_video(&self.pool, upload.video_id).await {
                Ok(Some(_)) => IngestError::Conflict(upload.video_id),
                Ok(None) => IngestError::VideoNotFound,
                Err(e) => IngestError::stage(IngestStage::Persisted, e),
            },
            Err(e) => IngestError::stage(IngestStage::Persisted, e),
        };

        warn!(video_id = %upload.video_id, key, error = %err, "commit failed; discarding stored object");
        if let Err(e) = self.store(upload.kind).delete(key).await {
            warn!(key, error = %e, "failed to discard orphaned object");
        }
        Err(err)
    }
}
