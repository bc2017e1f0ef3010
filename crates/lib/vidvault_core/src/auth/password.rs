//! Password hashing via bcrypt.

use tracing::warn;

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
///
/// A mismatch and an unreadable stored hash both yield
/// [`AuthError::CredentialError`].
pub fn verify_password(hash: &str, password: &str) -> Result<(), AuthError> {
    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::CredentialError),
        Err(e) => {
            warn!(error = %e, "stored password hash could not be verified");
            Err(AuthError::CredentialError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_succeeds() {
        let hash = hash_password("correct horse").expect("hash");
        assert_ne!(hash, "correct horse");
        verify_password(&hash, "correct horse").expect("verify");
    }

    #[test]
    fn wrong_password_is_credential_error() {
        let hash = hash_password("correct horse").expect("hash");
        let err = verify_password(&hash, "battery staple").unwrap_err();
        assert!(matches!(err, AuthError::CredentialError));
    }

    #[test]
    fn malformed_hash_is_credential_error() {
        let err = verify_password("not-a-bcrypt-hash", "anything").unwrap_err();
        assert!(matches!(err, AuthError::CredentialError));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same").expect("hash");
        let b = hash_password("same").expect("hash");
        assert_ne!(a, b);
    }
}
