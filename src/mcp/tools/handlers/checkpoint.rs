//! Checkpoint tools.

use super::json_result;
use crate::mcp::tool_types::{
    CheckpointListArgs, CheckpointResumeArgs, CheckpointSaveArgs, MAX_CONTENT_LENGTH,
    MAX_QUERY_LENGTH, parse_args, validate_input_length,
};
use crate::mcp::tools::ToolResult;
use crate::services::{ResumeRequest, ServiceContainer};
use crate::Result;
use serde_json::Value;

/// Executes `checkpoint_save`.
pub fn execute_checkpoint_save(
    services: &ServiceContainer,
    arguments: Value,
) -> Result<ToolResult> {
    let args: CheckpointSaveArgs = parse_args(arguments)?;
    validate_input_length(&args.summary, "summary", MAX_CONTENT_LENGTH)?;
    let entry = services.checkpoints().save(
        &args.tenant.into_context(),
        &args.session_id,
        &args.label,
        &args.summary,
    )?;
    json_result(&entry)
}

/// Executes `checkpoint_list`.
pub fn execute_checkpoint_list(
    services: &ServiceContainer,
    arguments: Value,
) -> Result<ToolResult> {
    let args: CheckpointListArgs = parse_args(arguments)?;
    let entries = services.checkpoints().list(
        &args.tenant.into_context(),
        args.session_id.as_deref(),
        args.limit.unwrap_or(services.config().search.default_limit),
    )?;
    json_result(&entries)
}

/// Executes `checkpoint_resume`.
pub fn execute_checkpoint_resume(
    services: &ServiceContainer,
    arguments: Value,
) -> Result<ToolResult> {
    let args: CheckpointResumeArgs = parse_args(arguments)?;
    let mut request = ResumeRequest::new(args.tenant.into_context(), args.token_budget)
        .with_limit(args.limit.unwrap_or(services.config().search.default_limit));
    if let Some(id) = args.checkpoint_id {
        request = request.by_id(id);
    }
    if let Some(query) = args.query {
        validate_input_length(&query, "query", MAX_QUERY_LENGTH)?;
        request = request.matching(query);
    }
    let result = services.checkpoints().resume(&request)?;
    json_result(&result)
}
