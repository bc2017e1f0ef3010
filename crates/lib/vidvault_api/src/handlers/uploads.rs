//! Media upload handlers. Both hand the multipart part to the ingestion
//! pipeline as a stream; nothing is buffered in memory.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Extension, Multipart, State};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_LENGTH;
use uuid::Uuid;
use vidvault_core::ingest::{IngestError, UploadKind};
use vidvault_core::media::{MediaError, UploadPart};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::handlers::videos::VideoId;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::VideoResponse;
use crate::services::videos::present;

/// `POST /api/video_upload/{id}` — upload the video body (`video` field).
pub async fn upload_video_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    VideoId(video_id): VideoId,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<VideoResponse>> {
    ingest_upload(&state, user_id, video_id, UploadKind::Video, &headers, multipart).await
}

/// `PUT /api/videos/{id}` — upload the thumbnail (`thumbnail` field).
pub async fn upload_thumbnail_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    VideoId(video_id): VideoId,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<VideoResponse>> {
    ingest_upload(&state, user_id, video_id, UploadKind::Thumbnail, &headers, multipart).await
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

async fn ingest_upload(
    state: &AppState,
    user_id: Uuid,
    video_id: Uuid,
    kind: UploadKind,
    headers: &HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<VideoResponse>> {
    // Ownership and the declared size are settled before the body is touched.
    let upload = state
        .ingest
        .authorize(user_id, video_id, kind, declared_length(headers))
        .await?;

    let mut multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(kind.field_name()) {
            continue;
        }
        let part = UploadPart {
            content_type: field.content_type().map(str::to_string),
            body: field,
        };
        let video = state.ingest.ingest(upload, part).await?;
        let resp = present(state.video_store.as_ref(), state.config.signed_url_ttl, video).await?;
        return Ok(Json(resp));
    }

    Err(IngestError::Rejected(MediaError::MissingField(kind.field_name().into())).into())
}
