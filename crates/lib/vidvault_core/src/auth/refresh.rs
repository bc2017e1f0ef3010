//! Refresh token store.
//!
//! Refresh tokens are 256 random bits, hex-encoded, handed to the client once
//! and persisted only as their SHA-256 hash. One row is written per login.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::RefreshTokenRecord;

/// Refresh token lifetime: 60 days.
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 60;

/// Default refresh token lifetime as a `Duration`.
pub fn refresh_token_ttl() -> Duration {
    Duration::days(REFRESH_TOKEN_EXPIRY_DAYS)
}

/// Generate a cryptographically random refresh token (64 hex chars).
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hash a refresh token for storage.
fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issue a new refresh token for `user_id`, valid for `ttl`.
/// Returns the plaintext token.
pub async fn issue_refresh_token(
    pool: &SqlitePool,
    user_id: Uuid,
    ttl: Duration,
) -> Result<String, AuthError> {
    let token = generate_refresh_token();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO refresh_tokens (token_hash, user_id, expires_at, revoked_at, created_at, updated_at) \
         VALUES (?, ?, ?, NULL, ?, ?)",
    )
    .bind(hash_refresh_token(&token))
    .bind(user_id)
    .bind(now + ttl)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    debug!(%user_id, "refresh token issued");
    Ok(token)
}

/// Look up the record for a plaintext refresh token, whatever its state.
pub async fn find_refresh_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<RefreshTokenRecord>, AuthError> {
    let record = sqlx::query_as::<_, RefreshTokenRecord>(
        "SELECT token_hash, user_id, expires_at, revoked_at, created_at \
         FROM refresh_tokens WHERE token_hash = ?",
    )
    .bind(hash_refresh_token(token))
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

/// Resolve a refresh token to its user.
///
/// Not found, expired and revoked are indistinguishable to the caller: all
/// yield [`AuthError::InvalidToken`].
pub async fn validate_refresh_token(pool: &SqlitePool, token: &str) -> Result<Uuid, AuthError> {
    match find_refresh_token(pool, token).await? {
        Some(record) if record.is_usable_at(Utc::now()) => Ok(record.user_id),
        Some(_) => {
            debug!("refresh token expired or revoked");
            Err(AuthError::InvalidToken)
        }
        None => Err(AuthError::InvalidToken),
    }
}

/// Revoke a refresh token. Revoking an unknown or already revoked token is
/// not an error; the first revocation timestamp is kept.
pub async fn revoke_refresh_token(pool: &SqlitePool, token: &str) -> Result<(), AuthError> {
    let now: DateTime<Utc> = Utc::now();
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = ?, updated_at = ? \
         WHERE token_hash = ? AND revoked_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(hash_refresh_token(token))
    .execute(pool)
    .await?;
    debug!(revoked = result.rows_affected(), "refresh token revoke");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::queries::create_user;
    use crate::{db, migrate};

    async fn pool_with_user() -> (SqlitePool, Uuid) {
        let pool = db::connect_in_memory().await.expect("pool");
        migrate::migrate(&pool).await.expect("migrate");
        let user = create_user(&pool, "r@example.com", "hash").await.unwrap();
        (pool, user.id)
    }

    #[test]
    fn generated_token_is_256_bits_of_hex() {
        let token = generate_refresh_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_refresh_token());
    }

    #[test]
    fn hash_is_stable_and_not_plaintext() {
        let token = "abc";
        assert_eq!(hash_refresh_token(token), hash_refresh_token(token));
        assert_ne!(hash_refresh_token(token), token);
    }

    #[tokio::test]
    async fn issued_token_validates() {
        let (pool, user_id) = pool_with_user().await;
        let token = issue_refresh_token(&pool, user_id, refresh_token_ttl()).await.unwrap();

        assert_eq!(validate_refresh_token(&pool, &token).await.unwrap(), user_id);

        let record = find_refresh_token(&pool, &token).await.unwrap().unwrap();
        assert_ne!(record.token_hash, token);
        assert!(record.revoked_at.is_none());
    }

    #[tokio::test]
    async fn revoked_token_is_invalid() {
        let (pool, user_id) = pool_with_user().await;
        let token = issue_refresh_token(&pool, user_id, refresh_token_ttl()).await.unwrap();

        revoke_refresh_token(&pool, &token).await.unwrap();
        assert!(matches!(
            validate_refresh_token(&pool, &token).await,
            Err(AuthError::InvalidToken)
        ));

        // Idempotent.
        revoke_refresh_token(&pool, &token).await.unwrap();
    }

    #[tokio::test]
    async fn expired_token_is_invalid() {
        let (pool, user_id) = pool_with_user().await;
        let token = issue_refresh_token(&pool, user_id, Duration::seconds(-1)).await.unwrap();

        assert!(matches!(
            validate_refresh_token(&pool, &token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn unknown_token_is_invalid_and_revoke_is_noop() {
        let (pool, _) = pool_with_user().await;
        assert!(matches!(
            validate_refresh_token(&pool, "deadbeef").await,
            Err(AuthError::InvalidToken)
        ));
        revoke_refresh_token(&pool, "deadbeef").await.unwrap();
    }

    #[tokio::test]
    async fn tokens_for_same_user_are_independent() {
        let (pool, user_id) = pool_with_user().await;
        let a = issue_refresh_token(&pool, user_id, refresh_token_ttl()).await.unwrap();
        let b = issue_refresh_token(&pool, user_id, refresh_token_ttl()).await.unwrap();
        assert_ne!(a, b);

        revoke_refresh_token(&pool, &a).await.unwrap();
        assert!(validate_refresh_token(&pool, &a).await.is_err());
        assert_eq!(validate_refresh_token(&pool, &b).await.unwrap(), user_id);
    }
}
