//! Video metadata handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use tracing::{info, warn};
use uuid::Uuid;
use vidvault_core::models::video::NewVideo;
use vidvault_core::videos;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{CreateVideoRequest, VideoResponse};
use crate::services::videos::{present, present_all};

/// Video ID path segment; a malformed ID is a 400 with the JSON envelope.
#[derive(Debug, Clone, Copy)]
pub struct VideoId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for VideoId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Validation("Invalid video ID".into()))?;
        Ok(VideoId(id))
    }
}

/// `POST /api/videos` — register a video with no media attached.
pub async fn create_video_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    body: Result<Json<CreateVideoRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<VideoResponse>)> {
    let Json(body) = body?;
    let title = body.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }

    let new = NewVideo {
        title: title.to_string(),
        description: body.description,
    };
    let video = videos::create_video(&state.pool, user_id, &new).await?;
    info!(%user_id, video_id = %video.id, "video created");

    let resp = present(state.video_store.as_ref(), state.config.signed_url_ttl, video).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `GET /api/videos` — the caller's videos, newest first.
pub async fn list_videos_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<VideoResponse>>> {
    let list = videos::list_videos_for_user(&state.pool, user_id).await?;
    let resp = present_all(state.video_store.as_ref(), state.config.signed_url_ttl, list).await?;
    Ok(Json(resp))
}

/// `GET /api/videos/{id}` — a single video.
pub async fn get_video_handler(
    State(state): State<AppState>,
    VideoId(video_id): VideoId,
) -> AppResult<Json<VideoResponse>> {
    let video = videos::get_video(&state.pool, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))?;
    let resp = present(state.video_store.as_ref(), state.config.signed_url_ttl, video).await?;
    Ok(Json(resp))
}

/// `DELETE /api/videos/{id}` — delete a video. Only its owner may.
pub async fn delete_video_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    VideoId(video_id): VideoId,
) -> AppResult<StatusCode> {
    let video = videos::get_video(&state.pool, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))?;

    if video.user_id != user_id {
        warn!(%user_id, %video_id, "delete of a video owned by another user");
        return Err(AppError::Unauthorized(
            "Not authorized to delete this video".into(),
        ));
    }

    if !videos::delete_video(&state.pool, user_id, video_id).await? {
        return Err(AppError::NotFound("Video not found".into()));
    }
    info!(%user_id, %video_id, "video deleted");
    Ok(StatusCode::NO_CONTENT)
}
