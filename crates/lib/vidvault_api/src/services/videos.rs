//! Video presentation: stored object keys become signed retrieval URLs.

use std::time::Duration;

use vidvault_core::models::video::Video;
use vidvault_core::storage::ObjectStore;

use crate::error::AppResult;
use crate::models::VideoResponse;

/// Present `video` to a client, signing its stored video key for `ttl`.
pub async fn present(store: &dyn ObjectStore, ttl: Duration, video: Video) -> AppResult<VideoResponse> {
    let video_url = match video.video_url.as_deref() {
        Some(key) if !key.is_empty() => Some(store.sign_get(key, ttl).await?),
        _ => None,
    };

    Ok(VideoResponse {
        id: video.id,
        user_id: video.user_id,
        title: video.title,
        description: video.description,
        thumbnail_url: video.thumbnail_url,
        video_url,
        created_at: video.created_at,
        updated_at: video.updated_at,
    })
}

pub async fn present_all(
    store: &dyn ObjectStore,
    ttl: Duration,
    videos: Vec<Video>,
) -> AppResult<Vec<VideoResponse>> {
    let mut presented = Vec::with_capacity(videos.len());
    for video in videos {
        presented.push(present(store, ttl, video).await?);
    }
    Ok(presented)
}
