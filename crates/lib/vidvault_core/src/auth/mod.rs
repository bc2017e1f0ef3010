//! Authentication and authorization logic.
//!
//! Provides password hashing, access-token (JWT) management, refresh-token
//! persistence and user queries shared by the API crate.

pub mod jwt;
pub mod password;
pub mod queries;
pub mod refresh;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    /// Any rejected access or refresh token. The reason is never surfaced.
    #[error("invalid or expired credential")]
    InvalidToken,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
