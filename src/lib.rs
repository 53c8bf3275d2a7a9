//! # Contextfold
//!
//! Durable, token-budgeted memory and context for AI coding agents.
//!
//! The crate bundles three tightly coupled subsystems:
//!
//! - **Context folding** ([`BranchManager`]): nested, budget- and deadline-bounded branches that
//!   hand only a scrubbed summary back to their caller.
//! - **Scoped search** ([`ScopedSearchEngine`]): tiered retrieval across
//!   project → team → org → public with early termination and deduplication.
//! - **ReasoningBank** ([`MemoryStore`]): confidence-scored memories that learn from
//!   feedback and outcomes, with periodic consolidation of near-duplicates.
//!
//! Transport, embedding inference, and persistence engines sit behind traits
//! ([`Embedder`], [`VectorStore`], [`SecretScrubber`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use contextfold::{CoreConfig, ServiceContainer};
//!
//! let services = ServiceContainer::from_config(&CoreConfig::default())?;
//! services.branches().open_session("session-1")?;
//! let created = services.branches().create(
//!     CreateBranchRequest::new("session-1", "investigate flaky test", "find the race"),
//! )?;
//! let returned = services.branches().return_branch(&created.branch_id, "root cause: ...")?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod embedding;
pub mod mcp;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;
mod sync;

pub use config::CoreConfig;
pub use embedding::Embedder;
pub use models::{
    Branch, BranchId, BranchStatus, MemoryEntry, MemoryId, MemoryStatus, Outcome, ScopedEntry,
    TenantContext, TenantScope, Tier,
};
pub use security::SecretScrubber;
pub use services::{
    BranchManager, CheckpointService, MemoryStore, RemediationService, ScopedSearchEngine,
    ServiceContainer,
};
pub use storage::VectorStore;

/// Error type for contextfold operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Validation` | Missing tenant, depth exceeded, non-positive limit, unknown session |
/// | `NotFound` | Unknown branch, memory, remediation or checkpoint id |
/// | `BudgetExceeded` | Work attempted on a branch whose budget is exhausted |
/// | `Timeout` | Work attempted on a branch past its deadline |
/// | `Backend` | Store or embedding failure, always wrapped with the failing operation |
/// | `Concurrency` | Consolidation already running for the same project |
///
/// Budget and timeout conditions on `branch_return` are not errors: they surface as
/// terminal branch statuses so the forced return can still report its partial result.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind (`branch`, `memory`, ...).
        kind: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// The branch has exhausted its token budget.
    #[error("branch {branch_id} exceeded its budget ({used}/{allocated} tokens)")]
    BudgetExceeded {
        /// The exhausted branch.
        branch_id: String,
        /// Tokens consumed so far.
        used: u64,
        /// Tokens allocated at creation.
        allocated: u64,
    },

    /// The branch passed its wall-clock deadline.
    #[error("branch {branch_id} timed out")]
    Timeout {
        /// The expired branch.
        branch_id: String,
    },

    /// A persistence, search or embedding backend failed.
    #[error("backend operation '{operation}' failed: {cause}")]
    Backend {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Lock contention on an exclusive operation; retry later.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),
}

impl Error {
    /// Wraps a backend failure with the operation that triggered it.
    pub fn backend(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Backend {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Returns a stable machine-readable code for the error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::Timeout { .. } => "timeout",
            Self::Backend { .. } => "backend_error",
            Self::Concurrency(_) => "concurrency_error",
        }
    }
}

/// Result type alias for contextfold operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Validation("limit must be positive".to_string());
        assert_eq!(err.to_string(), "validation error: limit must be positive");

        let err = Error::backend("store_query", "disk full");
        assert_eq!(
            err.to_string(),
            "backend operation 'store_query' failed: disk full"
        );

        let err = Error::NotFound {
            kind: "branch",
            id: "b-1".to_string(),
        };
        assert_eq!(err.to_string(), "branch not found: b-1");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Concurrency("busy".into()).code(), "concurrency_error");
        assert_eq!(
            Error::Timeout {
                branch_id: "b".into()
            }
            .code(),
            "timeout"
        );
    }
}
