//! Partitioned vector storage.
//!
//! Every record belongs to exactly one [`TenantScope`]. Queries name a single scope and
//! never see records from another, so tier walking and tenant isolation are enforced by
//! the callers composing per-scope queries rather than by filters inside one shared index.
//!
//! | Backend | Use Case |
//! |---------|----------|
//! | [`InMemoryVectorStore`] | Tests, ephemeral sessions |
//! | [`SqliteVectorStore`] | Single-node persistence |

mod memory;
mod sqlite;

pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::Result;
use crate::models::{RecordKind, TenantScope};
use serde_json::Value;

/// A stored vector with its JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Record id, unique across all scopes.
    pub id: String,
    /// Owning scope.
    pub scope: TenantScope,
    /// Record kind.
    pub kind: RecordKind,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Serialized entry.
    pub payload: Value,
}

/// A record with its similarity to the query vector.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    /// The matched record.
    pub record: StoredRecord,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// Filter applied inside a single scope.
///
/// `status`, `min_confidence` and `session_id` are read from the payload fields of the
/// same name, `excluded_entry_kind` from the payload `kind`. Records without a `status`
/// field never match a status filter.
#[derive(Debug, Clone, Default)]
pub struct StoreFilter {
    /// Restrict to one record kind.
    pub kind: Option<RecordKind>,
    /// Required payload `status`.
    pub status: Option<String>,
    /// Minimum payload `confidence`.
    pub min_confidence: Option<f32>,
    /// Required payload `session_id`.
    pub session_id: Option<String>,
    /// Payload `kind` that must not match.
    pub excluded_entry_kind: Option<String>,
}

impl StoreFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a record kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Requires a payload status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Requires a minimum payload confidence.
    #[must_use]
    pub const fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Requires a payload session id.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Excludes records whose payload `kind` equals `entry_kind`.
    #[must_use]
    pub fn without_entry_kind(mut self, entry_kind: impl Into<String>) -> Self {
        self.excluded_entry_kind = Some(entry_kind.into());
        self
    }

    /// Returns true if the record passes every set criterion.
    #[must_use]
    pub fn matches(&self, record: &StoredRecord) -> bool {
        if self.kind.is_some_and(|kind| kind != record.kind) {
            return false;
        }
        if let Some(status) = &self.status
            && record.payload.get("status").and_then(Value::as_str) != Some(status.as_str())
        {
            return false;
        }
        if let Some(min) = self.min_confidence {
            // Payload confidences are serialized f32 values; compare at that precision.
            #[allow(clippy::cast_possible_truncation)]
            let confidence = record
                .payload
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.0) as f32;
            if confidence < min {
                return false;
            }
        }
        if let Some(session) = &self.session_id
            && record.payload.get("session_id").and_then(Value::as_str) != Some(session.as_str())
        {
            return false;
        }
        if let Some(excluded) = &self.excluded_entry_kind
            && record.payload.get("kind").and_then(Value::as_str) == Some(excluded.as_str())
        {
            return false;
        }
        true
    }
}

/// Partitioned vector store.
///
/// Implementations must be thread-safe and must reject an upsert that would move an id
/// into a second scope.
pub trait VectorStore: Send + Sync {
    /// Backend name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Inserts or replaces a record in its scope.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] if the id already lives in another scope, or
    /// [`crate::Error::Backend`] on storage failure.
    fn upsert(&self, record: StoredRecord) -> Result<()>;

    /// Fetches a record by id within one scope.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    fn get(&self, scope: &TenantScope, id: &str) -> Result<Option<StoredRecord>>;

    /// Deletes a record. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    fn delete(&self, scope: &TenantScope, id: &str) -> Result<bool>;

    /// Scores the matching records in one scope, best first.
    ///
    /// `Some(limit)` keeps the `limit` most similar records. `None` returns every match so
    /// callers can rank by more than raw similarity before truncating.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    fn query(
        &self,
        scope: &TenantScope,
        vector: &[f32],
        filter: &StoreFilter,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredRecord>>;

    /// Lists all matching records in one scope, oldest insert first.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    fn list(&self, scope: &TenantScope, filter: &StoreFilter) -> Result<Vec<StoredRecord>>;

    /// Returns the scope that owns `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    fn locate(&self, id: &str) -> Result<Option<TenantScope>>;
}

/// Sorts scored records best first and keeps at most `limit` when one is given.
pub(crate) fn top_k(mut scored: Vec<ScoredRecord>, limit: Option<usize>) -> Vec<ScoredRecord> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    if let Some(limit) = limit {
        scored.truncate(limit);
    }
    scored
}
