//! Object-store key generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::{Rng, rng};

/// A random 256-bit, URL-safe identifier.
pub fn random_id() -> String {
    let mut bytes = [0u8; 32];
    rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build `{prefix}/{random-id}.{extension}`, or `{random-id}.{extension}`
/// without a prefix.
pub fn object_key(prefix: Option<&str>, extension: &str) -> String {
    let name = format!("{}.{extension}", random_id());
    match prefix {
        Some(prefix) => format!("{prefix}/{name}"),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_id_is_url_safe_256_bits() {
        let id = random_id();
        // 32 bytes, unpadded base64.
        assert_eq!(id.len(), 43);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(id, random_id());
    }

    #[test]
    fn key_layout() {
        let key = object_key(Some("landscape"), "mp4");
        let (prefix, name) = key.split_once('/').unwrap();
        assert_eq!(prefix, "landscape");
        assert!(name.ends_with(".mp4"));

        let bare = object_key(None, "png");
        assert!(!bare.contains('/'));
        assert!(bare.ends_with(".png"));
    }
}
