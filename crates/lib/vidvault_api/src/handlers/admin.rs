//! Development-only administration.

use axum::Json;
use axum::extract::State;
use tracing::warn;
use vidvault_core::auth::queries;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::ResetResponse;

/// `POST /admin/reset` — delete every user, their tokens and their videos.
///
/// Only available when the platform is `dev`.
pub async fn reset_handler(State(state): State<AppState>) -> AppResult<Json<ResetResponse>> {
    if !state.config.is_dev() {
        return Err(AppError::Forbidden(
            "Reset is only allowed in dev environment".into(),
        ));
    }

    let deleted_users = queries::delete_all_users(&state.pool).await?;
    warn!(deleted_users, "database reset");
    Ok(Json(ResetResponse { deleted_users }))
}
