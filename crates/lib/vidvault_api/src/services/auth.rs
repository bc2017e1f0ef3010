//! Authentication service: registration, login and refresh-token flows
//! delegating to `vidvault_core::auth`.

use sqlx::SqlitePool;
use tracing::info;
use vidvault_core::auth::password::{hash_password, verify_password};
use vidvault_core::auth::{AuthError, jwt, queries, refresh};

use crate::error::{AppError, AppResult};
use crate::models::{LoginResponse, TokenResponse, UserResponse};

/// Register a new user.
pub async fn register(pool: &SqlitePool, email: &str, password: &str) -> AppResult<UserResponse> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Email and password are required".into()));
    }

    if queries::email_exists(pool, email).await? {
        return Err(AppError::Validation("Email already registered".into()));
    }

    let hash = hash_password(password)?;
    let user = queries::create_user(pool, email, &hash).await?;
    info!(user_id = %user.id, "user registered");
    Ok(user.into())
}

/// Authenticate with email + password and issue a fresh token pair.
///
/// An unknown email and a wrong password are indistinguishable.
pub async fn login(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    token_secret: &[u8],
) -> AppResult<LoginResponse> {
    let found = queries::find_user_by_email(pool, email.trim())
        .await?
        .ok_or(AuthError::CredentialError)?;
    verify_password(&found.password_hash, password)?;

    let user = found.user;
    let token = jwt::issue_access_token(user.id, token_secret, jwt::access_token_ttl())?;
    let refresh_token =
        refresh::issue_refresh_token(pool, user.id, refresh::refresh_token_ttl()).await?;

    info!(user_id = %user.id, "user logged in");
    Ok(LoginResponse {
        user: user.into(),
        token,
        refresh_token,
    })
}

/// Exchange a refresh token for a new access token.
///
/// The refresh token is not rotated. Unknown, expired and revoked tokens all
/// yield the same 401. A revoke racing this call may let one more access
/// token through.
pub async fn refresh(
    pool: &SqlitePool,
    refresh_token: &str,
    token_secret: &[u8],
) -> AppResult<TokenResponse> {
    let user_id = refresh::validate_refresh_token(pool, refresh_token).await?;

    if queries::get_user_by_id(pool, user_id).await?.is_none() {
        return Err(AuthError::InvalidToken.into());
    }

    let token = jwt::issue_access_token(user_id, token_secret, jwt::access_token_ttl())?;
    Ok(TokenResponse { token })
}

/// Revoke a refresh token. Idempotent.
pub async fn revoke(pool: &SqlitePool, refresh_token: &str) -> AppResult<()> {
    refresh::revoke_refresh_token(pool, refresh_token).await?;
    Ok(())
}
