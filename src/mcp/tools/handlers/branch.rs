//! Session and branch tools.

use super::json_result;
use crate::mcp::tool_types::{
    BranchCreateArgs, BranchReturnArgs, BranchStatusArgs, BranchUsageArgs, MAX_CONTENT_LENGTH,
    SessionArgs, parse_args, validate_input_length,
};
use crate::mcp::tools::ToolResult;
use crate::models::{BranchId, CreateBranchRequest};
use crate::services::{ServiceContainer, StatusTarget};
use crate::{Error, Result};
use serde_json::{Value, json};

/// Executes `session_start`.
pub fn execute_session_start(services: &ServiceContainer, arguments: Value) -> Result<ToolResult> {
    let args: SessionArgs = parse_args(arguments)?;
    services.branches().open_session(&args.session_id)?;
    json_result(&json!({ "session_id": args.session_id, "open": true }))
}

/// Executes `session_end`.
pub fn execute_session_end(services: &ServiceContainer, arguments: Value) -> Result<ToolResult> {
    let args: SessionArgs = parse_args(arguments)?;
    let forced = services.branches().close_session(&args.session_id)?;
    json_result(&json!({
        "session_id": args.session_id,
        "open": false,
        "forced_returns": forced,
    }))
}

/// Executes `branch_create`.
pub fn execute_branch_create(services: &ServiceContainer, arguments: Value) -> Result<ToolResult> {
    let args: BranchCreateArgs = parse_args(arguments)?;
    validate_input_length(&args.prompt, "prompt", MAX_CONTENT_LENGTH)?;

    let mut request = CreateBranchRequest::new(args.session_id, args.description, args.prompt);
    if let Some(budget) = args.budget {
        request = request.with_budget(budget);
    }
    if let Some(seconds) = args.timeout_seconds {
        request = request.with_timeout_seconds(seconds);
    }
    if let Some(parent) = args.parent_id {
        request = request.with_parent(BranchId::new(parent));
    }

    let created = services.branches().create(request)?;
    json_result(&created)
}

/// Executes `branch_return`.
pub fn execute_branch_return(services: &ServiceContainer, arguments: Value) -> Result<ToolResult> {
    let args: BranchReturnArgs = parse_args(arguments)?;
    validate_input_length(&args.message, "message", MAX_CONTENT_LENGTH)?;
    let report = services
        .branches()
        .return_branch(&BranchId::new(args.branch_id), &args.message)?;
    json_result(&report)
}

/// Executes `branch_status`.
pub fn execute_branch_status(services: &ServiceContainer, arguments: Value) -> Result<ToolResult> {
    let args: BranchStatusArgs = parse_args(arguments)?;
    let target = match (args.branch_id, args.session_id) {
        (Some(branch), None) => StatusTarget::Branch(BranchId::new(branch)),
        (None, Some(session)) => StatusTarget::Session(session),
        _ => {
            return Err(Error::Validation(
                "exactly one of branch_id or session_id is required".to_string(),
            ));
        },
    };
    let report = services.branches().status(&target)?;
    json_result(&json!({
        "branch_id": report.branch_id,
        "status": report.status_label(),
        "depth": report.depth,
        "budget_used": report.budget_used,
        "budget_remaining": report.budget_remaining,
    }))
}

/// Executes `branch_usage`.
pub fn execute_branch_usage(services: &ServiceContainer, arguments: Value) -> Result<ToolResult> {
    let args: BranchUsageArgs = parse_args(arguments)?;
    if let Some(partial) = &args.partial {
        validate_input_length(partial, "partial", MAX_CONTENT_LENGTH)?;
    }
    let usage = services.branches().record_usage(
        &BranchId::new(args.branch_id),
        args.tokens,
        args.partial.as_deref(),
    )?;
    json_result(&usage)
}
