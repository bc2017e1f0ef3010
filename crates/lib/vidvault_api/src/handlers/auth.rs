//! Login and refresh-token handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::bearer_token;
use crate::models::{CredentialsRequest, LoginResponse, TokenResponse};
use crate::services::auth;

/// `POST /api/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(body) = body?;
    let resp = auth::login(
        &state.pool,
        &body.email,
        &body.password,
        state.config.token_secret.as_bytes(),
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /api/refresh` — exchange the bearer refresh token for an access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<TokenResponse>> {
    let token = bearer_token(&headers)?;
    let resp = auth::refresh(&state.pool, token, state.config.token_secret.as_bytes()).await?;
    Ok(Json(resp))
}

/// `POST /api/revoke` — revoke the bearer refresh token.
pub async fn revoke_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    let token = bearer_token(&headers)?;
    auth::revoke(&state.pool, token).await?;
    Ok(StatusCode::NO_CONTENT)
}
