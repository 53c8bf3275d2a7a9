//! Argument types and helper functions for the tools.
//!
//! # Security
//!
//! All argument types use `#[serde(deny_unknown_fields)]` so a misspelled or injected
//! field is rejected instead of silently ignored.

use crate::models::{TenantContext, Tier};
use crate::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Maximum length of content-like fields (memory content, return messages, summaries).
pub const MAX_CONTENT_LENGTH: usize = 1_048_576;

/// Maximum length of query fields.
pub const MAX_QUERY_LENGTH: usize = 10_240;

/// Caller's position in the tenant hierarchy.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantArgs {
    /// Project path or id.
    pub project_id: String,
    /// Team membership.
    pub team_id: Option<String>,
    /// Organization membership.
    pub org_id: Option<String>,
}

impl TenantArgs {
    /// Converts into a tenant context.
    #[must_use]
    pub fn into_context(self) -> TenantContext {
        let mut context = TenantContext::for_project(self.project_id);
        if let Some(team) = self.team_id {
            context = context.with_team(team);
        }
        if let Some(org) = self.org_id {
            context = context.with_org(org);
        }
        context
    }
}

/// Arguments for `session_start` and `session_end`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionArgs {
    /// Session id.
    pub session_id: String,
}

/// Arguments for `branch_create`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchCreateArgs {
    /// Owning session.
    pub session_id: String,
    /// What the branch is for.
    pub description: String,
    /// Instructions for the branch.
    pub prompt: String,
    /// Token budget.
    pub budget: Option<u64>,
    /// Deadline in seconds.
    pub timeout_seconds: Option<u64>,
    /// Explicit parent.
    pub parent_id: Option<String>,
}

/// Arguments for `branch_return`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchReturnArgs {
    /// Branch to return.
    pub branch_id: String,
    /// Result message; scrubbed before it leaves the branch.
    pub message: String,
}

/// Arguments for `branch_status`. Exactly one of the two ids must be given.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchStatusArgs {
    /// Report this branch.
    pub branch_id: Option<String>,
    /// Report this session's current branch.
    pub session_id: Option<String>,
}

/// Arguments for `branch_usage`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchUsageArgs {
    /// Branch to charge.
    pub branch_id: String,
    /// Tokens consumed since the last report.
    pub tokens: u64,
    /// Best result so far.
    pub partial: Option<String>,
}

/// Arguments for `memory_search`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemorySearchArgs {
    /// Project to search.
    pub project_id: String,
    /// Query text.
    pub query: String,
    /// Maximum results.
    pub limit: Option<usize>,
    /// Charge the returned content to this branch.
    pub branch_id: Option<String>,
}

/// Arguments for `memory_record`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryRecordArgs {
    /// Owning project.
    pub project_id: String,
    /// Short title.
    pub title: String,
    /// Strategy description.
    pub content: String,
    /// `success` (default) or `failure`.
    pub outcome: Option<String>,
    /// Tags.
    pub tags: Option<Vec<String>>,
    /// Producing session.
    pub session_id: Option<String>,
}

/// Arguments for `memory_get`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryGetArgs {
    /// Memory id.
    pub memory_id: String,
}

/// Arguments for `memory_feedback`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryFeedbackArgs {
    /// Memory id.
    pub memory_id: String,
    /// Whether the memory helped.
    pub helpful: bool,
}

/// Arguments for `memory_outcome`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryOutcomeArgs {
    /// Memory id.
    pub memory_id: String,
    /// Whether the task that used the memory succeeded.
    pub success: bool,
    /// Session the task ran in.
    pub session_id: Option<String>,
}

/// Arguments for `memory_consolidate`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConsolidateArgs {
    /// Project to consolidate.
    pub project_id: String,
    /// Cosine similarity threshold in `(0, 1]`.
    pub similarity_threshold: Option<f32>,
    /// Report without mutating.
    pub dry_run: Option<bool>,
    /// Cap on clusters consolidated.
    pub max_clusters: Option<usize>,
}

/// Arguments for `memory_consolidate_session`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConsolidateSessionArgs {
    /// Owning project.
    pub project_id: String,
    /// Session whose turns to flush.
    pub session_id: String,
}

/// Arguments for `remediation_search`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemediationSearchArgs {
    /// Caller's tenant position.
    pub tenant: TenantArgs,
    /// Query text, usually an error message.
    pub query: String,
    /// Maximum results.
    pub limit: Option<usize>,
    /// Confidence floor.
    pub min_confidence: Option<f32>,
    /// Whether wider tiers may be consulted (default true).
    pub include_hierarchy: Option<bool>,
    /// Charge the returned content to this branch.
    pub branch_id: Option<String>,
}

/// Arguments for `remediation_record`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemediationRecordArgs {
    /// Caller's tenant position.
    pub tenant: TenantArgs,
    /// Tier to publish into (default `project`).
    pub tier: Option<String>,
    /// Short title.
    pub title: String,
    /// The fix.
    pub content: String,
    /// Tags.
    pub tags: Option<Vec<String>>,
}

/// Arguments for `remediation_feedback`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemediationFeedbackArgs {
    /// Remediation id.
    pub remediation_id: String,
    /// Whether the fix helped.
    pub helpful: bool,
}

/// Arguments for `checkpoint_save`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointSaveArgs {
    /// Caller's tenant position.
    pub tenant: TenantArgs,
    /// Session being checkpointed.
    pub session_id: String,
    /// Short label.
    pub label: String,
    /// Session summary.
    pub summary: String,
}

/// Arguments for `checkpoint_list`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointListArgs {
    /// Caller's tenant position.
    pub tenant: TenantArgs,
    /// Only this session's checkpoints.
    pub session_id: Option<String>,
    /// Maximum entries (default 10).
    pub limit: Option<usize>,
}

/// Arguments for `checkpoint_resume`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointResumeArgs {
    /// Caller's tenant position.
    pub tenant: TenantArgs,
    /// Resume exactly this checkpoint.
    pub checkpoint_id: Option<String>,
    /// Otherwise resume the best matches for this text.
    pub query: Option<String>,
    /// Tokens the resumed content may occupy.
    pub token_budget: u64,
    /// Candidates considered.
    pub limit: Option<usize>,
}

/// Deserializes tool arguments, mapping failures to validation errors.
///
/// # Errors
///
/// Returns [`Error::Validation`] for missing, mistyped or unknown fields.
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| Error::Validation(format!("invalid arguments: {e}")))
}

/// Rejects inputs longer than `max_length` bytes.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the input is too long.
pub fn validate_input_length(input: &str, field_name: &str, max_length: usize) -> Result<()> {
    if input.len() > max_length {
        return Err(Error::Validation(format!(
            "{field_name} exceeds maximum length ({} > {max_length} bytes)",
            input.len()
        )));
    }
    Ok(())
}

/// Parses a tier name.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an unknown tier.
pub fn parse_tier(value: &str) -> Result<Tier> {
    Tier::parse(value).ok_or_else(|| Error::Validation(format!("unknown tier '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<SessionArgs> = parse_args(json!({"session_id": "s", "admin": true}));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_nested_tenant_args() {
        let args: CheckpointListArgs = parse_args(json!({
            "tenant": {"project_id": "repo", "team_id": "core"},
            "limit": 3
        }))
        .unwrap();
        let context = args.tenant.into_context();
        assert_eq!(context.scope_for(Tier::Team).unwrap().key(), "team:core");
        assert!(context.scope_for(Tier::Org).is_err());
    }

    #[test]
    fn test_validate_input_length() {
        assert!(validate_input_length("abc", "query", 3).is_ok());
        assert!(validate_input_length("abcd", "query", 3).is_err());
    }

    #[test]
    fn test_parse_tier() {
        assert_eq!(parse_tier("team").unwrap(), Tier::Team);
        assert!(parse_tier("galaxy").is_err());
    }
}
