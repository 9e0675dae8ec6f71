//! Cache key derivation.
//!
//! Keys are used as given: no normalization beyond what each function
//! documents.

use sha2::{Digest, Sha256};

/// Content cache key: hex SHA-256 of `locale|query`.
///
/// Case-sensitive in both inputs.
pub fn content_cache_key(query: &str, locale: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(locale.as_bytes());
    hasher.update(b"|");
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}

/// Idea cache and persistent store key: `locale:lowercased-query`.
pub fn idea_cache_key(query: &str, locale: &str) -> String {
    format!("{}:{}", locale, query.to_lowercase())
}
