//! In-memory vector store.

use super::{ScoredRecord, StoreFilter, StoredRecord, VectorStore, top_k};
use crate::embedding::cosine_similarity;
use crate::models::TenantScope;
use crate::sync::{read_lock, write_lock};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Partitions {
    /// Scope key to records in insertion order.
    scopes: HashMap<String, Vec<StoredRecord>>,
    /// Record id to owning scope.
    owners: HashMap<String, TenantScope>,
}

/// Brute-force in-memory store partitioned by scope.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    inner: RwLock<Partitions>,
}

impl InMemoryVectorStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        read_lock(&self.inner).owners.len()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn upsert(&self, record: StoredRecord) -> Result<()> {
        let mut inner = write_lock(&self.inner);
        if let Some(owner) = inner.owners.get(&record.id)
            && owner != &record.scope
        {
            return Err(Error::Validation(format!(
                "record {} already belongs to scope {owner}",
                record.id
            )));
        }

        inner
            .owners
            .insert(record.id.clone(), record.scope.clone());
        let partition = inner.scopes.entry(record.scope.key()).or_default();
        if let Some(existing) = partition.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else {
            partition.push(record);
        }
        Ok(())
    }

    fn get(&self, scope: &TenantScope, id: &str) -> Result<Option<StoredRecord>> {
        let inner = read_lock(&self.inner);
        Ok(inner
            .scopes
            .get(&scope.key())
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    fn delete(&self, scope: &TenantScope, id: &str) -> Result<bool> {
        let mut inner = write_lock(&self.inner);
        let Some(partition) = inner.scopes.get_mut(&scope.key()) else {
            return Ok(false);
        };
        let before = partition.len();
        partition.retain(|r| r.id != id);
        let removed = partition.len() < before;
        if removed {
            inner.owners.remove(id);
        }
        Ok(removed)
    }

    fn query(
        &self,
        scope: &TenantScope,
        vector: &[f32],
        filter: &StoreFilter,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredRecord>> {
        let inner = read_lock(&self.inner);
        let Some(records) = inner.scopes.get(&scope.key()) else {
            return Ok(Vec::new());
        };
        let scored = records
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| ScoredRecord {
                score: cosine_similarity(vector, &r.vector),
                record: r.clone(),
            })
            .collect();
        Ok(top_k(scored, limit))
    }

    fn list(&self, scope: &TenantScope, filter: &StoreFilter) -> Result<Vec<StoredRecord>> {
        let inner = read_lock(&self.inner);
        Ok(inner
            .scopes
            .get(&scope.key())
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn locate(&self, id: &str) -> Result<Option<TenantScope>> {
        Ok(read_lock(&self.inner).owners.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordKind;
    use serde_json::json;

    fn record(id: &str, scope: TenantScope, vector: Vec<f32>) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            scope,
            kind: RecordKind::Remediation,
            vector,
            payload: json!({"confidence": 0.5}),
        }
    }

    fn project(id: &str) -> TenantScope {
        TenantScope::Project(id.to_string())
    }

    #[test]
    fn test_query_stays_in_scope() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("a", project("p1"), vec![1.0, 0.0])).unwrap();
        store.upsert(record("b", project("p2"), vec![1.0, 0.0])).unwrap();

        let hits = store
            .query(&project("p1"), &[1.0, 0.0], &StoreFilter::new(), Some(10))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "a");
    }

    #[test]
    fn test_query_orders_by_similarity() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("far", TenantScope::Public, vec![0.0, 1.0])).unwrap();
        store.upsert(record("near", TenantScope::Public, vec![1.0, 0.1])).unwrap();

        let hits = store
            .query(&TenantScope::Public, &[1.0, 0.0], &StoreFilter::new(), Some(1))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "near");
    }

    #[test]
    fn test_upsert_rejects_second_scope() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("a", project("p1"), vec![1.0])).unwrap();
        let err = store.upsert(record("a", project("p2"), vec![1.0])).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.locate("a").unwrap(), Some(project("p1")));
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("a", project("p1"), vec![1.0])).unwrap();
        let mut updated = record("a", project("p1"), vec![1.0]);
        updated.payload = json!({"confidence": 0.9});
        store.upsert(updated).unwrap();

        assert_eq!(store.len(), 1);
        let got = store.get(&project("p1"), "a").unwrap().unwrap();
        assert_eq!(got.payload["confidence"], 0.9);
    }

    #[test]
    fn test_delete_releases_owner() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("a", project("p1"), vec![1.0])).unwrap();
        assert!(!store.delete(&project("p2"), "a").unwrap());
        assert!(store.delete(&project("p1"), "a").unwrap());
        assert!(store.is_empty());
        assert_eq!(store.locate("a").unwrap(), None);
    }
}
