//! Normalized content hashing for cross-tier deduplication.

use sha2::{Digest, Sha256};

/// Hashes content after normalization.
///
/// Content is trimmed, lowercased, and internal whitespace runs collapse to one space,
/// so entries differing only in formatting share a hash.
pub struct ContentHasher;

impl ContentHasher {
    /// Lowercase hex SHA-256 of the normalized content (64 characters).
    #[must_use]
    pub fn hash(content: &str) -> String {
        let normalized = Self::normalize(content);
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Normalizes content for hashing.
    #[must_use]
    pub fn normalize(content: &str) -> String {
        content
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
