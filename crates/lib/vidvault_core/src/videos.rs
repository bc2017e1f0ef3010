//! Video record persistence.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::video::{NewVideo, Video};

const VIDEO_COLUMNS: &str =
    "id, user_id, title, description, thumbnail_url, video_url, created_at, updated_at";

/// Which media URL column of a video an upload rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaUrlField {
    Thumbnail,
    Video,
}

impl MediaUrlField {
    /// The current value of this field on `video`.
    pub fn current<'a>(&self, video: &'a Video) -> Option<&'a str> {
        match self {
            MediaUrlField::Thumbnail => video.thumbnail_url.as_deref(),
            MediaUrlField::Video => video.video_url.as_deref(),
        }
    }
}

/// Register a video with no media attached.
pub async fn create_video(
    pool: &SqlitePool,
    user_id: Uuid,
    new: &NewVideo,
) -> Result<Video, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Video>(&format!(
        "INSERT INTO videos (id, user_id, title, description, thumbnail_url, video_url, created_at, updated_at) \
         VALUES (?, ?, ?, ?, NULL, NULL, ?, ?) \
         RETURNING {VIDEO_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Get a video by ID.
pub async fn get_video(pool: &SqlitePool, video_id: Uuid) -> Result<Option<Video>, sqlx::Error> {
    sqlx::query_as::<_, Video>(&format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?"))
        .bind(video_id)
        .fetch_optional(pool)
        .await
}

/// List a user's videos, newest first.
pub async fn list_videos_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
) -> Result<Vec<Video>, sqlx::Error> {
    sqlx::query_as::<_, Video>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos WHERE user_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Delete a video owned by `user_id`. Returns whether a row was removed.
pub async fn delete_video(
    pool: &SqlitePool,
    user_id: Uuid,
    video_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM videos WHERE id = ? AND user_id = ?")
        .bind(video_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Rewrite one media URL field of a video.
///
/// With `expected = Some(previous)` the write only applies if the field still
/// holds `previous` (`None` meaning unset). Returns `None` when no row was
/// updated, either because the video is gone or the field had moved on.
pub async fn set_media_url(
    pool: &SqlitePool,
    video_id: Uuid,
    field: MediaUrlField,
    value: &str,
    expected: Option<Option<&str>>,
) -> Result<Option<Video>, sqlx::Error> {
    let column = match field {
        MediaUrlField::Thumbnail => "thumbnail_url",
        MediaUrlField::Video => "video_url",
    };
    let guard = if expected.is_some() {
        format!(" AND {column} IS ?")
    } else {
        String::new()
    };
    let sql = format!(
        "UPDATE videos SET {column} = ?, updated_at = ? WHERE id = ?{guard} RETURNING {VIDEO_COLUMNS}"
    );

    let mut query = sqlx::query_as::<_, Video>(&sql)
        .bind(value)
        .bind(Utc::now())
        .bind(video_id);
    if let Some(previous) = expected {
        query = query.bind(previous);
    }
    query.fetch_optional(pool).await
}
