//! API server configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Environment tag that unlocks development-only endpoints.
pub const DEV_PLATFORM: &str = "dev";

/// Configuration errors detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("token secret must not be empty")]
    EmptySecret,

    #[error("signed URL expiry must be greater than zero")]
    ZeroUrlExpiry,
}

/// Configuration for the API server.
///
/// Built once by the binary and shared read-only by every handler.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8091").
    pub bind_addr: String,
    /// Deployment environment tag (`dev` enables `/admin/reset`).
    pub platform: String,
    /// Access token signing secret.
    pub token_secret: String,
    /// Root of the web application bundle served under `/app`.
    pub app_dir: PathBuf,
    /// Root of uploaded assets served under `/assets`.
    pub assets_dir: PathBuf,
    /// Lifetime of signed video retrieval URLs.
    pub signed_url_ttl: Duration,
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.signed_url_ttl.is_zero() {
            return Err(ConfigError::ZeroUrlExpiry);
        }
        Ok(())
    }

    pub fn is_dev(&self) -> bool {
        self.platform == DEV_PLATFORM
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("platform", &self.platform)
            .field("token_secret", &"<redacted>")
            .field("app_dir", &self.app_dir)
            .field("assets_dir", &self.assets_dir)
            .field("signed_url_ttl", &self.signed_url_ttl)
            .finish()
    }
}
