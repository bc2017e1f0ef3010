//! User registration handler.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{CredentialsRequest, UserResponse};
use crate::services::auth;

/// `POST /api/users` — create a user account.
pub async fn create_user_handler(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let Json(body) = body?;
    let user = auth::register(&state.pool, &body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
