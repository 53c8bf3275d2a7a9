//! Tiered retrieval over tenant partitions.
//!
//! Scopes are walked narrowest first (project, team, org, public) as an explicit ordered
//! list. A wider scope is queried only while the accumulated, deduplicated results are
//! still under the requested limit. Tiers are queried strictly in sequence; there is no
//! speculative prefetch of the next tier.

use crate::config::HierarchyFailurePolicy;
use crate::embedding::Embedder;
use crate::models::confidence::adjust_confidence;
use crate::models::{
    ConfidenceUpdate, RecordKind, ScopedEntry, ScopedHit, ScopedQuery, ScopedSearchResponse,
    TenantScope,
};
use crate::observability::record_request_id;
use crate::security::SecretScrubber;
use crate::services::content_hash::ContentHasher;
use crate::storage::{StoreFilter, StoredRecord, VectorStore};
use crate::sync::{KeyedLocks, acquire_lock};
use crate::{Error, Result};
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Hierarchical search engine for one record kind.
pub struct ScopedSearchEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    scrubber: Arc<dyn SecretScrubber>,
    kind: RecordKind,
    policy: HierarchyFailurePolicy,
    max_limit: usize,
    entry_locks: KeyedLocks,
}

impl ScopedSearchEngine {
    /// Creates an engine over `store` for entries of `kind`.
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        scrubber: Arc<dyn SecretScrubber>,
        kind: RecordKind,
    ) -> Self {
        Self {
            store,
            embedder,
            scrubber,
            kind,
            policy: HierarchyFailurePolicy::default(),
            max_limit: 50,
            entry_locks: KeyedLocks::new(),
        }
    }

    /// Sets the mid-hierarchy failure policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: HierarchyFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the upper bound on requested limits.
    #[must_use]
    pub const fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit;
        self
    }

    /// The record kind this engine serves.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Scrubs, embeds and stores an entry in its scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a kind mismatch or empty content, and
    /// [`Error::Backend`] if embedding or the store fails.
    #[instrument(
        name = "contextfold.search.insert",
        skip_all,
        fields(kind = self.kind.as_str(), scope = %entry.scope, request_id = tracing::field::Empty)
    )]
    pub fn insert(&self, mut entry: ScopedEntry) -> Result<ScopedEntry> {
        record_request_id();
        if entry.kind != self.kind {
            return Err(Error::Validation(format!(
                "cannot store a {} entry in the {} index",
                entry.kind.as_str(),
                self.kind.as_str()
            )));
        }
        if entry.content.trim().is_empty() {
            return Err(Error::Validation("content must not be empty".to_string()));
        }

        entry.title = self.scrubber.scrub(&entry.title);
        entry.content = self.scrubber.scrub(&entry.content);
        let vector = self.embed(&entry.embedding_text())?;
        self.store.upsert(StoredRecord {
            id: entry.id.clone(),
            scope: entry.scope.clone(),
            kind: self.kind,
            vector,
            payload: encode(&entry)?,
        })?;

        metrics::counter!("scoped_entries_written_total", "kind" => self.kind.as_str())
            .increment(1);
        tracing::debug!(id = %entry.id, "stored scoped entry");
        Ok(entry)
    }

    /// Fetches an entry by id from whichever scope owns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the store fails.
    pub fn get(&self, id: &str) -> Result<Option<ScopedEntry>> {
        let Some(scope) = self.store.locate(id)? else {
            return Ok(None);
        };
        self.get_in(&scope, id)
    }

    /// Fetches an entry by id from one scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the store fails or the payload is malformed.
    pub fn get_in(&self, scope: &TenantScope, id: &str) -> Result<Option<ScopedEntry>> {
        match self.store.get(scope, id)? {
            Some(record) if record.kind == self.kind => decode(&record).map(Some),
            _ => Ok(None),
        }
    }

    /// Lists entries in one scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the store fails.
    pub fn list(&self, scope: &TenantScope, filter: StoreFilter) -> Result<Vec<ScopedEntry>> {
        let filter = filter.with_kind(self.kind);
        self.store
            .list(scope, &filter)?
            .iter()
            .map(decode)
            .collect()
    }

    /// Applies a helpful/unhelpful signal to an entry's confidence.
    ///
    /// The read-modify-write is serialized per entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or [`Error::Backend`] on store failure.
    #[instrument(
        name = "contextfold.search.feedback",
        skip(self),
        fields(kind = self.kind.as_str(), request_id = tracing::field::Empty)
    )]
    pub fn feedback(&self, id: &str, helpful: bool) -> Result<ConfidenceUpdate> {
        record_request_id();
        let lock = self.entry_locks.get(id);
        let _held = acquire_lock(&lock);

        let not_found = || Error::NotFound {
            kind: self.kind.as_str(),
            id: id.to_string(),
        };
        let scope = self.store.locate(id)?.ok_or_else(not_found)?;
        let mut record = self
            .store
            .get(&scope, id)?
            .filter(|r| r.kind == self.kind)
            .ok_or_else(not_found)?;
        let mut entry = decode(&record)?;

        let previous = entry.confidence;
        entry.set_confidence(adjust_confidence(previous, helpful));
        entry.last_used_at = Utc::now();
        record.payload = encode(&entry)?;
        self.store.upsert(record)?;

        metrics::counter!(
            "scoped_feedback_total",
            "kind" => self.kind.as_str(),
            "helpful" => if helpful { "true" } else { "false" }
        )
        .increment(1);
        Ok(ConfidenceUpdate {
            previous,
            confidence: entry.confidence,
        })
    }

    /// Runs a tiered search.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty query, a zero limit, an out-of-range
    /// confidence floor or an unresolvable tenant. Returns [`Error::Backend`] if the
    /// narrowest tier fails, or any tier under [`HierarchyFailurePolicy::Fail`].
    #[instrument(
        name = "contextfold.search.scoped",
        skip_all,
        fields(
            kind = self.kind.as_str(),
            limit = query.limit,
            include_hierarchy = query.include_hierarchy,
            scopes_searched = tracing::field::Empty,
            results = tracing::field::Empty,
            request_id = tracing::field::Empty
        )
    )]
    pub fn search(&self, query: &ScopedQuery) -> Result<ScopedSearchResponse> {
        record_request_id();
        let start = Instant::now();
        let result = self.search_inner(query);

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "scoped_search_total",
            "kind" => self.kind.as_str(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!("scoped_search_duration_ms", "kind" => self.kind.as_str())
            .record(start.elapsed().as_secs_f64() * 1000.0);

        if let Ok(response) = &result {
            let span = tracing::Span::current();
            span.record("scopes_searched", response.scopes_searched);
            span.record("results", response.results.len());
            if response.early_terminated {
                metrics::counter!("scoped_search_early_terminations_total", "kind" => self.kind.as_str())
                    .increment(1);
            }
        }
        result
    }

    fn search_inner(&self, query: &ScopedQuery) -> Result<ScopedSearchResponse> {
        self.validate(query)?;
        let scopes = query.tenant.resolve()?;
        let vector = self.embed(&query.text)?;
        let filter = StoreFilter::new()
            .with_kind(self.kind)
            .with_min_confidence(query.min_confidence);

        let mut response = ScopedSearchResponse::default();
        let mut by_content: HashMap<String, ScopedHit> = HashMap::new();

        for (index, scope) in scopes.iter().enumerate() {
            let tier = scope.tier();
            // Every qualifying entry in the tier is ranked; cutting by raw similarity first
            // could drop an entry that ranks higher once confidence is applied.
            let scored = match self.store.query(scope, &vector, &filter, None) {
                Ok(scored) => scored,
                Err(e) if index > 0 && self.policy == HierarchyFailurePolicy::Partial => {
                    tracing::warn!(tier = %tier, error = %e, "tier failed, returning partial results");
                    metrics::counter!("scoped_search_partial_total", "kind" => self.kind.as_str())
                        .increment(1);
                    response.partial = true;
                    response
                        .warnings
                        .push(self.scrubber.scrub(&format!("{tier} tier unavailable: {e}")));
                    break;
                },
                Err(e) => {
                    let cause = self.scrubber.scrub(&e.to_string());
                    return Err(Error::backend(format!("scoped_search_{tier}"), cause));
                },
            };
            response.scopes_searched += 1;
            response.tiers_searched.push(tier);

            for hit in scored {
                let entry = decode(&hit.record)?;
                let candidate = ScopedHit {
                    id: entry.id.clone(),
                    score: hit.score,
                    tier,
                    confidence: entry.confidence,
                    rank: ScopedHit::ranking_key(hit.score, entry.confidence),
                    last_used_at: entry.last_used_at,
                    entry,
                };
                // Equal scores keep the earlier, narrower tier.
                match by_content.entry(ContentHasher::hash(&candidate.entry.content)) {
                    Entry::Occupied(mut existing) => {
                        if candidate.score > existing.get().score {
                            existing.insert(candidate);
                        }
                    },
                    Entry::Vacant(slot) => {
                        slot.insert(candidate);
                    },
                }
            }

            if by_content.len() >= query.limit || !query.include_hierarchy {
                response.early_terminated = index + 1 < scopes.len();
                break;
            }
        }

        let mut results: Vec<ScopedHit> = by_content.into_values().collect();
        results.sort_by(compare_hits);
        results.truncate(query.limit);
        response.results = results;
        Ok(response)
    }

    fn validate(&self, query: &ScopedQuery) -> Result<()> {
        if query.text.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".to_string()));
        }
        if query.limit == 0 {
            return Err(Error::Validation("limit must be positive".to_string()));
        }
        if query.limit > self.max_limit {
            return Err(Error::Validation(format!(
                "limit must be at most {}",
                self.max_limit
            )));
        }
        if !(0.0..=1.0).contains(&query.min_confidence) {
            return Err(Error::Validation(
                "min_confidence must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).map_err(|e| match e {
            Error::Validation(_) | Error::Backend { .. } => e,
            other => Error::backend("embed", other),
        })
    }
}

/// Rank descending, then most recently used, then narrowest tier.
fn compare_hits(a: &ScopedHit, b: &ScopedHit) -> Ordering {
    b.rank
        .total_cmp(&a.rank)
        .then_with(|| b.last_used_at.cmp(&a.last_used_at))
        .then_with(|| a.tier.proximity().cmp(&b.tier.proximity()))
}

fn encode(entry: &ScopedEntry) -> Result<serde_json::Value> {
    serde_json::to_value(entry).map_err(|e| Error::backend("encode_entry", e))
}

fn decode(record: &StoredRecord) -> Result<ScopedEntry> {
    serde_json::from_value(record.payload.clone()).map_err(|e| Error::backend("decode_entry", e))
}
