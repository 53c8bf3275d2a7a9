//! Scoped search requests and results.

use super::{ScopedEntry, TenantContext, Tier};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A tiered search request.
#[derive(Debug, Clone)]
pub struct ScopedQuery {
    /// Free-text query.
    pub text: String,
    /// Caller's tenant position.
    pub tenant: TenantContext,
    /// Maximum results; must be positive.
    pub limit: usize,
    /// Candidates below this confidence are dropped before ranking.
    pub min_confidence: f32,
    /// Whether wider tiers may be consulted.
    pub include_hierarchy: bool,
}

impl ScopedQuery {
    /// Creates a query with `limit = 10`, no confidence floor, and hierarchy enabled.
    #[must_use]
    pub fn new(text: impl Into<String>, tenant: TenantContext) -> Self {
        Self {
            text: text.into(),
            tenant,
            limit: 10,
            min_confidence: 0.0,
            include_hierarchy: true,
        }
    }

    /// Sets the result limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the confidence floor.
    #[must_use]
    pub const fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Enables or disables hierarchy traversal.
    #[must_use]
    pub const fn with_hierarchy(mut self, include_hierarchy: bool) -> Self {
        self.include_hierarchy = include_hierarchy;
        self
    }
}

/// One ranked result.
#[derive(Debug, Clone, Serialize)]
pub struct ScopedHit {
    /// Entry id.
    pub id: String,
    /// Similarity score.
    pub score: f32,
    /// Tier the entry was found in.
    pub tier: Tier,
    /// Entry confidence.
    pub confidence: f32,
    /// `score * (0.5 + 0.5 * confidence)`.
    pub rank: f32,
    /// Last use time, the first tie-breaker.
    pub last_used_at: DateTime<Utc>,
    /// The entry itself.
    pub entry: ScopedEntry,
}

impl ScopedHit {
    /// Computes the ranking key for a similarity/confidence pair.
    #[must_use]
    pub fn ranking_key(score: f32, confidence: f32) -> f32 {
        score * confidence.mul_add(0.5, 0.5)
    }
}

/// Outcome of a tiered search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScopedSearchResponse {
    /// Ranked, deduplicated results.
    pub results: Vec<ScopedHit>,
    /// Number of tiers actually queried.
    pub scopes_searched: usize,
    /// Tiers queried, in order.
    pub tiers_searched: Vec<Tier>,
    /// True when traversal stopped before exhausting the available tiers.
    pub early_terminated: bool,
    /// True when a later tier failed and earlier results were returned anyway.
    pub partial: bool,
    /// Scrubbed warnings for the caller.
    pub warnings: Vec<String>,
}
