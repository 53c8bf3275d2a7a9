//! Remediation tools.

use super::json_result;
use crate::mcp::tool_types::{
    MAX_CONTENT_LENGTH, MAX_QUERY_LENGTH, RemediationFeedbackArgs, RemediationRecordArgs,
    RemediationSearchArgs, parse_args, parse_tier, validate_input_length,
};
use crate::mcp::tools::ToolResult;
use crate::models::{BranchId, ScopedQuery, Tier};
use crate::services::{RecordRemediation, ServiceContainer};
use crate::Result;
use serde_json::{Value, json};

/// Executes `remediation_search`.
pub fn execute_remediation_search(
    services: &ServiceContainer,
    arguments: Value,
) -> Result<ToolResult> {
    let args: RemediationSearchArgs = parse_args(arguments)?;
    validate_input_length(&args.query, "query", MAX_QUERY_LENGTH)?;
    let search = &services.config().search;
    let query = ScopedQuery::new(args.query, args.tenant.into_context())
        .with_limit(args.limit.unwrap_or(search.default_limit))
        .with_min_confidence(args.min_confidence.unwrap_or(search.default_min_confidence))
        .with_hierarchy(args.include_hierarchy.unwrap_or(true));

    match args.branch_id {
        Some(branch_id) => {
            let lookup = services
                .branches()
                .search_remediations(&BranchId::new(branch_id), &query)?;
            json_result(&json!({ "response": lookup.results, "usage": lookup.usage }))
        },
        None => json_result(&json!({ "response": services.remediation().search(&query)? })),
    }
}

/// Executes `remediation_record`.
pub fn execute_remediation_record(
    services: &ServiceContainer,
    arguments: Value,
) -> Result<ToolResult> {
    let args: RemediationRecordArgs = parse_args(arguments)?;
    validate_input_length(&args.content, "content", MAX_CONTENT_LENGTH)?;
    let tier = args.tier.as_deref().map_or(Ok(Tier::Project), parse_tier)?;
    let request = RecordRemediation::new(args.tenant.into_context(), args.title, args.content)
        .in_tier(tier)
        .with_tags(args.tags.unwrap_or_default());
    let entry = services.remediation().record(request)?;
    json_result(&entry)
}

/// Executes `remediation_feedback`.
pub fn execute_remediation_feedback(
    services: &ServiceContainer,
    arguments: Value,
) -> Result<ToolResult> {
    let args: RemediationFeedbackArgs = parse_args(arguments)?;
    let update = services
        .remediation()
        .feedback(&args.remediation_id, args.helpful)?;
    json_result(&update)
}
