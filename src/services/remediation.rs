//! Remediation instances: fixes that worked, shared across tenant tiers.

use crate::models::{
    ConfidenceUpdate, RecordKind, ScopedEntry, ScopedQuery, ScopedSearchResponse, TenantContext,
    Tier,
};
use crate::services::scoped_search::ScopedSearchEngine;
use crate::{Error, Result};

/// Request to record a remediation.
#[derive(Debug, Clone)]
pub struct RecordRemediation {
    /// Caller's tenant position.
    pub tenant: TenantContext,
    /// Tier to publish into.
    pub tier: Tier,
    /// Short title, usually the error signature.
    pub title: String,
    /// The fix.
    pub content: String,
    /// Tags for filtering.
    pub tags: Vec<String>,
}

impl RecordRemediation {
    /// Creates a project-tier remediation.
    #[must_use]
    pub fn new(
        tenant: TenantContext,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tenant,
            tier: Tier::Project,
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
        }
    }

    /// Publishes into `tier` instead of the project.
    #[must_use]
    pub const fn in_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Adds tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Records, searches and rates remediations.
pub struct RemediationService {
    engine: ScopedSearchEngine,
}

impl RemediationService {
    /// Wraps an engine serving [`RecordKind::Remediation`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the engine serves another kind.
    pub fn new(engine: ScopedSearchEngine) -> Result<Self> {
        if engine.kind() != RecordKind::Remediation {
            return Err(Error::Validation(format!(
                "remediation service needs a remediation index, got {}",
                engine.kind().as_str()
            )));
        }
        Ok(Self { engine })
    }

    /// Stores a remediation in the requested tier of the caller's tenant context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the title is blank or the caller has no membership
    /// at that tier, and [`Error::Backend`] if storing fails.
    pub fn record(&self, request: RecordRemediation) -> Result<ScopedEntry> {
        if request.title.trim().is_empty() {
            return Err(Error::Validation("title must not be empty".to_string()));
        }
        let scope = request.tenant.scope_for(request.tier)?;
        let mut entry = ScopedEntry::new(
            RecordKind::Remediation,
            scope,
            request.title.trim(),
            request.content,
        );
        entry.tags = request
            .tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self.engine.insert(entry)
    }

    /// Tiered search over remediations.
    ///
    /// # Errors
    ///
    /// See [`ScopedSearchEngine::search`].
    pub fn search(&self, query: &ScopedQuery) -> Result<ScopedSearchResponse> {
        self.engine.search(query)
    }

    /// Fetches a remediation by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn get(&self, id: &str) -> Result<ScopedEntry> {
        self.engine.get(id)?.ok_or_else(|| Error::NotFound {
            kind: "remediation",
            id: id.to_string(),
        })
    }

    /// Applies the shared confidence rule to a remediation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn feedback(&self, id: &str, helpful: bool) -> Result<ConfidenceUpdate> {
        self.engine.feedback(id, helpful)
    }
}
