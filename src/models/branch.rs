//! Context-folding branch types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(String);

impl BranchId {
    /// Creates a branch ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("br_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BranchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Branch lifecycle status. Every status except `Active` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    /// Accepting work.
    Active,
    /// Returned normally within budget.
    Completed,
    /// Finalized because the branch or an ancestor reported an error.
    Failed,
    /// Finalized by deadline, session teardown, or an ancestor's return.
    Timeout,
    /// Finalized because usage reached the allocated budget.
    BudgetExceeded,
}

impl BranchStatus {
    /// Returns the status as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::BudgetExceeded => "budget_exceeded",
        }
    }

    /// Returns true for every status except `Active`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time view of a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    /// Unique identifier.
    pub id: BranchId,
    /// Owning session.
    pub session_id: String,
    /// Parent branch, `None` for session roots.
    pub parent_id: Option<BranchId>,
    /// Nesting depth; roots are depth 0.
    pub depth: u32,
    /// What the branch is for.
    pub description: String,
    /// Tokens the branch may consume.
    pub budget_allocated: u64,
    /// Tokens consumed so far, including returned children.
    pub budget_used: u64,
    /// Lifecycle status.
    pub status: BranchStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Wall-clock deadline.
    pub timeout_at: DateTime<Utc>,
    /// Time the branch reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Direct children in creation order.
    pub children: Vec<BranchId>,
}

impl Branch {
    /// Tokens left before forced return.
    #[must_use]
    pub const fn budget_remaining(&self) -> u64 {
        self.budget_allocated.saturating_sub(self.budget_used)
    }
}

/// Parameters for creating a branch.
#[derive(Debug, Clone, Default)]
pub struct CreateBranchRequest {
    /// Session the branch belongs to. Must be open.
    pub session_id: String,
    /// Short description.
    pub description: String,
    /// Instruction for the sub-task.
    pub prompt: String,
    /// Token budget; configured default when `None`.
    pub budget: Option<u64>,
    /// Deadline in seconds; configured default when `None`.
    pub timeout_seconds: Option<u64>,
    /// Explicit parent; otherwise the session's current active branch.
    pub parent_id: Option<BranchId>,
}

impl CreateBranchRequest {
    /// Creates a request with default budget and timeout.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        description: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            description: description.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the token budget.
    #[must_use]
    pub const fn with_budget(mut self, budget: u64) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Sets the timeout in seconds.
    #[must_use]
    pub const fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Nests under an explicit parent.
    #[must_use]
    pub fn with_parent(mut self, parent_id: BranchId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Result of `branch_create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedBranch {
    /// The new branch.
    pub branch_id: BranchId,
    /// Budget after clamping to the parent's remaining budget.
    pub budget_allocated: u64,
    /// Nesting depth.
    pub depth: u32,
}

/// Result of `branch_status`.
///
/// `status` is `None` when a session has no active branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchStatusReport {
    /// The reported branch, if any.
    pub branch_id: Option<BranchId>,
    /// Its status, if any.
    pub status: Option<BranchStatus>,
    /// Nesting depth.
    pub depth: u32,
    /// Tokens consumed.
    pub budget_used: u64,
    /// Tokens left.
    pub budget_remaining: u64,
}

impl BranchStatusReport {
    /// Report for a session with no active branch.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            branch_id: None,
            status: None,
            depth: 0,
            budget_used: 0,
            budget_remaining: 0,
        }
    }

    /// Status label, `none` when no branch is active.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        self.status.as_ref().map_or("none", BranchStatus::as_str)
    }
}

impl From<&Branch> for BranchStatusReport {
    fn from(branch: &Branch) -> Self {
        Self {
            branch_id: Some(branch.id.clone()),
            status: Some(branch.status),
            depth: branch.depth,
            budget_used: branch.budget_used,
            budget_remaining: branch.budget_remaining(),
        }
    }
}

/// Final report of a branch, produced by explicit or forced return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchReturn {
    /// The finalized branch.
    pub branch_id: BranchId,
    /// Terminal status.
    pub status: BranchStatus,
    /// Total tokens charged, never capped at the budget.
    pub tokens_used: u64,
    /// Budget the branch had.
    pub budget_allocated: u64,
    /// Scrubbed final or best-known partial result.
    pub scrubbed_message: String,
    /// Children that were force-returned as part of this return.
    pub forced_children: Vec<BranchId>,
}

/// Result of charging usage to a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    /// The charged branch.
    pub branch_id: BranchId,
    /// Status after charging.
    pub status: BranchStatus,
    /// Tokens consumed.
    pub budget_used: u64,
    /// Tokens left.
    pub budget_remaining: u64,
    /// Present when the charge exhausted the budget and forced a return.
    pub forced_return: Option<BranchReturn>,
}
