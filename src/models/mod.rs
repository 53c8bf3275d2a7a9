//! Data models for contextfold.
//!
//! This module contains the core data structures shared by the services.

mod branch;
pub mod confidence;
mod consolidation;
mod memory;
mod scope;
mod scoped;
mod search;

pub use branch::{
    Branch, BranchId, BranchReturn, BranchStatus, BranchStatusReport, CreateBranchRequest,
    CreatedBranch, UsageReport,
};
pub use confidence::ConfidenceUpdate;
pub use consolidation::{
    ConsolidationOptions, ConsolidationReport, DEFAULT_SIMILARITY_THRESHOLD, SessionConsolidation,
};
pub use memory::{EntryKind, MemoryEntry, MemoryHit, MemoryId, MemoryStatus, Outcome};
pub use scope::{TenantContext, TenantScope, Tier};
pub use scoped::{RecordKind, ScopedEntry};
pub use search::{ScopedHit, ScopedQuery, ScopedSearchResponse};
