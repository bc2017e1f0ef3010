//! JWT access token generation and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::TokenClaims;

/// Issuer tag carried by every access token. Tokens minted for any other
/// purpose are rejected.
pub const ACCESS_TOKEN_ISSUER: &str = "vidvault-access";

/// Access token lifetime: 24 hours.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 24 * 60 * 60;

/// Default access token lifetime as a `Duration`.
pub fn access_token_ttl() -> Duration {
    Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS)
}

/// Generate a signed JWT access token (HS256) for `user_id`, valid for `ttl`.
pub fn issue_access_token(user_id: Uuid, secret: &[u8], ttl: Duration) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = TokenClaims {
        iss: ACCESS_TOKEN_ISSUER.to_string(),
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
}

/// Verify an access token and return the user it was issued to.
///
/// Signature, issuer, expiry and subject are all checked; every failure maps
/// to [`AuthError::InvalidToken`].
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[ACCESS_TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    let claims = decode::<TokenClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| {
            debug!(error = %e, "access token rejected");
            AuthError::InvalidToken
        })?
        .claims;

    // Issuer and expiry are re-checked independently of the decoder.
    if claims.iss != ACCESS_TOKEN_ISSUER {
        debug!(issuer = %claims.iss, "access token has foreign issuer");
        return Err(AuthError::InvalidToken);
    }
    if Utc::now().timestamp() >= claims.exp {
        debug!(exp = claims.exp, "access token expired");
        return Err(AuthError::InvalidToken);
    }

    Uuid::parse_str(&claims.sub).map_err(|_| {
        debug!("access token subject is not a user id");
        AuthError::InvalidToken
    })
}
