//! Business logic services.
//!
//! Services orchestrate the store, embedder and scrubber and provide the high-level
//! operations behind the tool surface.

mod branch;
mod checkpoint;
pub mod content_hash;
mod memory;
mod remediation;
mod scoped_search;
pub mod tokens;

pub use branch::{BranchLookup, BranchManager, StatusTarget};
pub use checkpoint::{CheckpointService, ResumeRequest, ResumeResult};
pub use content_hash::ContentHasher;
pub use memory::{MemoryStore, RecordMemory};
pub use remediation::{RecordRemediation, RemediationService};
pub use scoped_search::ScopedSearchEngine;
pub use tokens::TokenEstimator;

use crate::Result;
use crate::config::{CoreConfig, StorageBackend};
use crate::embedding::{Embedder, HashEmbedder};
use crate::models::RecordKind;
use crate::security::{RegexScrubber, SecretScrubber};
use crate::storage::{InMemoryVectorStore, SqliteVectorStore, VectorStore};
use std::sync::Arc;

/// Wires every service over one store, embedder and scrubber.
///
/// # Example
///
/// ```rust,ignore
/// use contextfold::{CoreConfig, ServiceContainer};
///
/// let services = ServiceContainer::from_config(&CoreConfig::default())?;
/// let hits = services.memory().search("repo", "flaky test", 5)?;
/// ```
pub struct ServiceContainer {
    config: CoreConfig,
    store: Arc<dyn VectorStore>,
    scrubber: Arc<dyn SecretScrubber>,
    branches: Arc<BranchManager>,
    memory: Arc<MemoryStore>,
    remediation: Arc<RemediationService>,
    checkpoints: Arc<CheckpointService>,
}

impl ServiceContainer {
    /// Builds the services described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Backend`] if the `SQLite` store cannot be opened.
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        let store: Arc<dyn VectorStore> = match &config.storage.backend {
            StorageBackend::Memory => Arc::new(InMemoryVectorStore::new()),
            StorageBackend::Sqlite(path) => Arc::new(SqliteVectorStore::new(path)?),
        };
        let embedder = Arc::new(HashEmbedder::with_dimensions(config.embedding.dimensions));
        tracing::info!(
            store = store.name(),
            dimensions = embedder.dimensions(),
            "initializing services"
        );
        Self::with_components(store, embedder, Arc::new(RegexScrubber::new()), config.clone())
    }

    /// Builds the services over explicit components.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] if a service rejects its engine.
    pub fn with_components(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        scrubber: Arc<dyn SecretScrubber>,
        config: CoreConfig,
    ) -> Result<Self> {
        let engine = |kind| {
            ScopedSearchEngine::new(
                Arc::clone(&store),
                Arc::clone(&embedder),
                Arc::clone(&scrubber),
                kind,
            )
            .with_policy(config.search.hierarchy_failure)
            .with_max_limit(config.search.max_limit)
        };

        let memory = Arc::new(MemoryStore::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            Arc::clone(&scrubber),
            config.memory.clone(),
        ));
        let remediation = Arc::new(RemediationService::new(engine(RecordKind::Remediation))?);
        let checkpoints = Arc::new(CheckpointService::new(
            engine(RecordKind::Checkpoint),
            Arc::clone(&scrubber),
            TokenEstimator::new(config.branch.chars_per_token),
        )?);
        let branches = Arc::new(
            BranchManager::new(config.branch.clone(), Arc::clone(&scrubber))
                .with_memory(Arc::clone(&memory))
                .with_remediation(Arc::clone(&remediation)),
        );

        Ok(Self {
            config,
            store,
            scrubber,
            branches,
            memory,
            remediation,
            checkpoints,
        })
    }

    /// The configuration the services were built from.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The shared store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    /// The shared scrubber.
    #[must_use]
    pub fn scrubber(&self) -> Arc<dyn SecretScrubber> {
        Arc::clone(&self.scrubber)
    }

    /// Context folding.
    #[must_use]
    pub fn branches(&self) -> Arc<BranchManager> {
        Arc::clone(&self.branches)
    }

    /// ReasoningBank memories.
    #[must_use]
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Remediations.
    #[must_use]
    pub fn remediation(&self) -> &RemediationService {
        &self.remediation
    }

    /// Checkpoints.
    #[must_use]
    pub fn checkpoints(&self) -> &CheckpointService {
        &self.checkpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateBranchRequest, TenantContext};

    #[test]
    fn test_from_default_config() {
        let services = ServiceContainer::from_config(&CoreConfig::default()).unwrap();
        assert_eq!(services.store().name(), "memory");

        let branches = services.branches();
        branches.open_session("s1").unwrap();
        let created = branches
            .create(CreateBranchRequest::new("s1", "look around", "p").with_budget(500))
            .unwrap();
        services
            .remediation()
            .record(RecordRemediation::new(
                TenantContext::for_project("repo"),
                "timeout in ci",
                "raise the test timeout",
            ))
            .unwrap();

        let query = crate::models::ScopedQuery::new("ci timeout", TenantContext::for_project("repo"));
        let lookup = branches.search_remediations(&created.branch_id, &query).unwrap();
        assert_eq!(lookup.results.results.len(), 1);
        assert!(lookup.usage.budget_used > 0);
    }

    #[test]
    fn test_sqlite_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CoreConfig::default().with_sqlite(dir.path().join("store.db"));
        let services = ServiceContainer::from_config(&config).unwrap();
        assert_eq!(services.store().name(), "sqlite");
    }
}
