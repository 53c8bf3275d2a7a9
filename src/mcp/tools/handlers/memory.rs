//! ReasoningBank tools.

use super::json_result;
use crate::mcp::tool_types::{
    MAX_CONTENT_LENGTH, MAX_QUERY_LENGTH, MemoryConsolidateArgs, MemoryConsolidateSessionArgs,
    MemoryFeedbackArgs, MemoryGetArgs, MemoryOutcomeArgs, MemoryRecordArgs, MemorySearchArgs,
    parse_args, validate_input_length,
};
use crate::mcp::tools::ToolResult;
use crate::models::{BranchId, ConsolidationOptions, MemoryId, Outcome};
use crate::services::{RecordMemory, ServiceContainer};
use crate::{Error, Result};
use serde_json::{Value, json};

/// Executes `memory_search`.
///
/// With a `branch_id`, the search runs on behalf of that branch and its cost is charged.
pub fn execute_memory_search(services: &ServiceContainer, arguments: Value) -> Result<ToolResult> {
    let args: MemorySearchArgs = parse_args(arguments)?;
    validate_input_length(&args.query, "query", MAX_QUERY_LENGTH)?;
    let limit = args.limit.unwrap_or(services.config().search.default_limit);

    match args.branch_id {
        Some(branch_id) => {
            let lookup = services.branches().search_memories(
                &BranchId::new(branch_id),
                &args.project_id,
                &args.query,
                limit,
            )?;
            json_result(&json!({ "results": lookup.results, "usage": lookup.usage }))
        },
        None => {
            let results = services.memory().search(&args.project_id, &args.query, limit)?;
            json_result(&json!({ "results": results }))
        },
    }
}

/// Executes `memory_record`.
pub fn execute_memory_record(services: &ServiceContainer, arguments: Value) -> Result<ToolResult> {
    let args: MemoryRecordArgs = parse_args(arguments)?;
    validate_input_length(&args.content, "content", MAX_CONTENT_LENGTH)?;
    let outcome = match args.outcome.as_deref() {
        Some(value) => Outcome::parse(value)
            .ok_or_else(|| Error::Validation(format!("unknown outcome '{value}'")))?,
        None => Outcome::default(),
    };

    let mut request = RecordMemory::new(args.project_id, args.title, args.content, outcome)
        .with_tags(args.tags.unwrap_or_default());
    if let Some(session) = args.session_id {
        request = request.with_session(session);
    }
    let entry = services.memory().record(request)?;
    json_result(&entry)
}

/// Executes `memory_get`.
pub fn execute_memory_get(services: &ServiceContainer, arguments: Value) -> Result<ToolResult> {
    let args: MemoryGetArgs = parse_args(arguments)?;
    let entry = services.memory().get(&MemoryId::new(args.memory_id))?;
    json_result(&entry)
}

/// Executes `memory_feedback`.
pub fn execute_memory_feedback(
    services: &ServiceContainer,
    arguments: Value,
) -> Result<ToolResult> {
    let args: MemoryFeedbackArgs = parse_args(arguments)?;
    let update = services
        .memory()
        .feedback(&MemoryId::new(args.memory_id), args.helpful)?;
    json_result(&update)
}

/// Executes `memory_outcome`.
pub fn execute_memory_outcome(services: &ServiceContainer, arguments: Value) -> Result<ToolResult> {
    let args: MemoryOutcomeArgs = parse_args(arguments)?;
    let update = services.memory().outcome(
        &MemoryId::new(args.memory_id),
        args.success,
        args.session_id.as_deref(),
    )?;
    json_result(&update)
}

/// Executes `memory_consolidate`.
pub fn execute_memory_consolidate(
    services: &ServiceContainer,
    arguments: Value,
) -> Result<ToolResult> {
    let args: MemoryConsolidateArgs = parse_args(arguments)?;
    let mut options = ConsolidationOptions::default().with_threshold(
        args.similarity_threshold
            .unwrap_or(services.memory().config().similarity_threshold),
    );
    if args.dry_run.unwrap_or(false) {
        options = options.dry_run();
    }
    if let Some(max) = args.max_clusters {
        options = options.with_max_clusters(max);
    }
    let report = services.memory().consolidate(&args.project_id, options)?;
    json_result(&report)
}

/// Executes `memory_consolidate_session`.
pub fn execute_memory_consolidate_session(
    services: &ServiceContainer,
    arguments: Value,
) -> Result<ToolResult> {
    let args: MemoryConsolidateSessionArgs = parse_args(arguments)?;
    let flushed = services
        .memory()
        .consolidate_session(&args.project_id, &args.session_id)?;
    json_result(&flushed)
}
