//! Memory consolidation types.

use super::MemoryId;
use serde::Serialize;

/// Default similarity threshold for grouping memories.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.8;

/// Options for a consolidation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsolidationOptions {
    /// Minimum cosine similarity for two memories to share a cluster.
    pub similarity_threshold: f32,
    /// Report clusters without mutating anything.
    pub dry_run: bool,
    /// Maximum clusters to consolidate; `0` means unlimited.
    pub max_clusters: usize,
}

impl Default for ConsolidationOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            dry_run: false,
            max_clusters: 0,
        }
    }
}

impl ConsolidationOptions {
    /// Sets the similarity threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Enables dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Caps the number of clusters.
    #[must_use]
    pub const fn with_max_clusters(mut self, max_clusters: usize) -> Self {
        self.max_clusters = max_clusters;
        self
    }
}

/// Result of a consolidation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsolidationReport {
    /// Consolidated entries created (empty on dry runs).
    pub created: Vec<MemoryId>,
    /// Number of originals archived.
    pub archived: usize,
    /// Singleton groups plus clusters left over by `max_clusters`.
    pub skipped_count: usize,
    /// Active memories examined.
    pub total_processed: usize,
    /// Wall-clock duration.
    pub duration_seconds: f64,
    /// Member ids of every cluster selected for consolidation.
    pub clusters: Vec<Vec<MemoryId>>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

/// Result of flushing a session's buffered turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionConsolidation {
    /// Session-level memories created.
    pub created: Vec<MemoryId>,
    /// Turn-level entries archived into them.
    pub archived: usize,
}

impl SessionConsolidation {
    /// Returns true when nothing was buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.archived == 0
    }
}
