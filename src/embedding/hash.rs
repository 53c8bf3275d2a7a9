//! Deterministic bag-of-words embedder.
//!
//! Hashes normalized tokens into a fixed number of buckets. Texts sharing most of their
//! words land close together, which is enough for near-duplicate detection and tests.
//! It does not capture synonyms; swap in a model-backed [`Embedder`] for that.

use super::{DEFAULT_DIMENSIONS, Embedder};
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Limit on tokens considered per text.
const MAX_TOKENS: usize = 2_000;

/// Hash-based embedder.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Creates an embedder with [`DEFAULT_DIMENSIONS`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    /// Creates an embedder with custom dimensions (minimum 8).
    #[must_use]
    pub const fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: if dimensions < 8 { 8 } else { dimensions },
        }
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .take(MAX_TOKENS)
            .map(str::to_lowercase)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let value = u64::from_le_bytes(head);
        let index = (value % self.dimensions as u64) as usize;
        // One hash bit picks the sign so unrelated tokens partly cancel.
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::Validation("cannot embed empty text".to_string()));
        }

        let mut embedding = vec![0.0f32; self.dimensions];
        for token in Self::tokens(text) {
            let (index, sign) = self.bucket(&token);
            embedding[index] += sign;
        }

        let norm_sq: f32 = embedding.iter().map(|x| x * x).sum();
        if norm_sq > 0.0 {
            let inv_norm = norm_sq.sqrt().recip();
            for v in &mut embedding {
                *v *= inv_norm;
            }
        }
        Ok(embedding)
    }
}
