//! Identifier helpers: random UUIDs and content-addressed URIs.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a fresh random identifier (interactions, sessions, ...).
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Derive a stable, content-addressed hex digest from arbitrary parts.
///
/// Used to build Document URIs from `title + canonical content` (§4.8 step
/// 1) so re-ingesting identical content is idempotent at the identifier
/// level, and to key the embedding cache (§4.4) on `sha256(text)`.
#[must_use]
pub fn content_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]); // separator so ("ab","c") != ("a","bc")
    }
    hex::encode(hasher.finalize())
}

/// Minimal hex encoding (avoids pulling in the `hex` crate for four lines of
/// code the rest of the workspace doesn't otherwise need).
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let bytes = bytes.as_ref();
        let mut s = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        let a = content_hash(&["title", "body"]);
        let b = content_hash(&["title", "body"]);
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_distinguishes_split_point() {
        let a = content_hash(&["ab", "c"]);
        let b = content_hash(&["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn new_id_is_unique() {
        assert_ne!(new_id(), new_id());
    }
}
