//! Tool definitions.
//!
//! JSON Schema for every tool's input. Schemas mirror the argument structs in
//! [`crate::mcp::tool_types`], including `additionalProperties: false`.

use super::ToolDefinition;
use serde_json::{Value, json};

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn tenant_schema() -> Value {
    json!({
        "type": "object",
        "description": "Caller's position in the tenant hierarchy",
        "properties": {
            "project_id": { "type": "string", "description": "Project path or id" },
            "team_id": { "type": "string", "description": "Team membership" },
            "org_id": { "type": "string", "description": "Organization membership" }
        },
        "required": ["project_id"],
        "additionalProperties": false
    })
}

/// Every tool, in registration order.
pub fn all() -> Vec<ToolDefinition> {
    vec![
        session_start_tool(),
        session_end_tool(),
        branch_create_tool(),
        branch_return_tool(),
        branch_status_tool(),
        branch_usage_tool(),
        memory_search_tool(),
        memory_record_tool(),
        memory_get_tool(),
        memory_feedback_tool(),
        memory_outcome_tool(),
        memory_consolidate_tool(),
        memory_consolidate_session_tool(),
        remediation_search_tool(),
        remediation_record_tool(),
        remediation_feedback_tool(),
        checkpoint_save_tool(),
        checkpoint_list_tool(),
        checkpoint_resume_tool(),
    ]
}

/// Defines the session start tool.
pub fn session_start_tool() -> ToolDefinition {
    tool(
        "session_start",
        "Open a session so branches can be created in it",
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string", "description": "Session id" }
            },
            "required": ["session_id"],
            "additionalProperties": false
        }),
    )
}

/// Defines the session end tool.
pub fn session_end_tool() -> ToolDefinition {
    tool(
        "session_end",
        "Close a session, force-returning every branch still active in it",
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string", "description": "Session id" }
            },
            "required": ["session_id"],
            "additionalProperties": false
        }),
    )
}

/// Defines the branch create tool.
pub fn branch_create_tool() -> ToolDefinition {
    tool(
        "branch_create",
        "Start a nested, token-budgeted branch for a sub-task. Only a scrubbed summary comes back to the caller.",
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string", "description": "Owning session" },
                "description": { "type": "string", "description": "What the branch is for" },
                "prompt": { "type": "string", "description": "Instructions for the branch" },
                "budget": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Token budget, clamped to the parent's remaining budget"
                },
                "timeout_seconds": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Deadline in seconds, clamped to the parent's deadline"
                },
                "parent_id": {
                    "type": "string",
                    "description": "Explicit parent; defaults to the session's current branch"
                }
            },
            "required": ["session_id", "description", "prompt"],
            "additionalProperties": false
        }),
    )
}

/// Defines the branch return tool.
pub fn branch_return_tool() -> ToolDefinition {
    tool(
        "branch_return",
        "Return a branch with its result. Active child branches are force-returned first.",
        json!({
            "type": "object",
            "properties": {
                "branch_id": { "type": "string", "description": "Branch to return" },
                "message": { "type": "string", "description": "Result summary" }
            },
            "required": ["branch_id", "message"],
            "additionalProperties": false
        }),
    )
}

/// Defines the branch status tool.
pub fn branch_status_tool() -> ToolDefinition {
    tool(
        "branch_status",
        "Report a branch, or the current branch of a session (status 'none' when idle)",
        json!({
            "type": "object",
            "properties": {
                "branch_id": { "type": "string", "description": "Branch to report" },
                "session_id": { "type": "string", "description": "Session whose current branch to report" }
            },
            "oneOf": [
                { "required": ["branch_id"] },
                { "required": ["session_id"] }
            ],
            "additionalProperties": false
        }),
    )
}

/// Defines the branch usage tool.
pub fn branch_usage_tool() -> ToolDefinition {
    tool(
        "branch_usage",
        "Charge consumed tokens to a branch and record its best partial result",
        json!({
            "type": "object",
            "properties": {
                "branch_id": { "type": "string", "description": "Branch to charge" },
                "tokens": { "type": "integer", "minimum": 0, "description": "Tokens consumed" },
                "partial": { "type": "string", "description": "Best result so far" }
            },
            "required": ["branch_id", "tokens"],
            "additionalProperties": false
        }),
    )
}

/// Defines the memory search tool.
pub fn memory_search_tool() -> ToolDefinition {
    tool(
        "memory_search",
        "Search a project's memories, ranked by similarity weighted by confidence",
        json!({
            "type": "object",
            "properties": {
                "project_id": { "type": "string", "description": "Project to search" },
                "query": { "type": "string", "description": "Query text" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 50, "description": "Maximum results (default: 10)" },
                "branch_id": { "type": "string", "description": "Charge the returned content to this branch" }
            },
            "required": ["project_id", "query"],
            "additionalProperties": false
        }),
    )
}

/// Defines the memory record tool.
pub fn memory_record_tool() -> ToolDefinition {
    tool(
        "memory_record",
        "Record a strategy and whether it worked. Content is scrubbed of secrets before storage.",
        json!({
            "type": "object",
            "properties": {
                "project_id": { "type": "string", "description": "Owning project" },
                "title": { "type": "string", "description": "Short title" },
                "content": { "type": "string", "description": "Strategy description" },
                "outcome": { "type": "string", "enum": ["success", "failure"], "description": "Default: success" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "session_id": { "type": "string", "description": "Producing session" }
            },
            "required": ["project_id", "title", "content"],
            "additionalProperties": false
        }),
    )
}

/// Defines the memory get tool.
pub fn memory_get_tool() -> ToolDefinition {
    tool(
        "memory_get",
        "Fetch a memory by id, including archived ones",
        json!({
            "type": "object",
            "properties": {
                "memory_id": { "type": "string" }
            },
            "required": ["memory_id"],
            "additionalProperties": false
        }),
    )
}

/// Defines the memory feedback tool.
pub fn memory_feedback_tool() -> ToolDefinition {
    tool(
        "memory_feedback",
        "Rate a memory: helpful raises confidence by 0.1, unhelpful lowers it by 0.15",
        json!({
            "type": "object",
            "properties": {
                "memory_id": { "type": "string" },
                "helpful": { "type": "boolean" }
            },
            "required": ["memory_id", "helpful"],
            "additionalProperties": false
        }),
    )
}

/// Defines the memory outcome tool.
pub fn memory_outcome_tool() -> ToolDefinition {
    tool(
        "memory_outcome",
        "Report whether a task that used a memory succeeded (same adjustment as feedback)",
        json!({
            "type": "object",
            "properties": {
                "memory_id": { "type": "string" },
                "success": { "type": "boolean" },
                "session_id": { "type": "string" }
            },
            "required": ["memory_id", "success"],
            "additionalProperties": false
        }),
    )
}

/// Defines the memory consolidate tool.
pub fn memory_consolidate_tool() -> ToolDefinition {
    tool(
        "memory_consolidate",
        "Merge clusters of near-duplicate memories into consolidated entries, archiving the originals",
        json!({
            "type": "object",
            "properties": {
                "project_id": { "type": "string" },
                "similarity_threshold": { "type": "number", "exclusiveMinimum": 0, "maximum": 1, "description": "Default: 0.8" },
                "dry_run": { "type": "boolean", "description": "Report clusters without changing anything" },
                "max_clusters": { "type": "integer", "minimum": 0, "description": "0 means unlimited" }
            },
            "required": ["project_id"],
            "additionalProperties": false
        }),
    )
}

/// Defines the memory session consolidation tool.
pub fn memory_consolidate_session_tool() -> ToolDefinition {
    tool(
        "memory_consolidate_session",
        "Flush a session's buffered turns into session-level memories",
        json!({
            "type": "object",
            "properties": {
                "project_id": { "type": "string" },
                "session_id": { "type": "string" }
            },
            "required": ["project_id", "session_id"],
            "additionalProperties": false
        }),
    )
}

/// Defines the remediation search tool.
pub fn remediation_search_tool() -> ToolDefinition {
    tool(
        "remediation_search",
        "Find fixes for an error, searching project, then team, org and public tiers until enough results are found",
        json!({
            "type": "object",
            "properties": {
                "tenant": tenant_schema(),
                "query": { "type": "string", "description": "Error message or symptom" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 50 },
                "min_confidence": { "type": "number", "minimum": 0, "maximum": 1 },
                "include_hierarchy": { "type": "boolean", "description": "Default: true" },
                "branch_id": { "type": "string", "description": "Charge the returned content to this branch" }
            },
            "required": ["tenant", "query"],
            "additionalProperties": false
        }),
    )
}

/// Defines the remediation record tool.
pub fn remediation_record_tool() -> ToolDefinition {
    tool(
        "remediation_record",
        "Record a fix into one tier of the caller's tenant hierarchy",
        json!({
            "type": "object",
            "properties": {
                "tenant": tenant_schema(),
                "tier": { "type": "string", "enum": ["project", "team", "org", "public"], "description": "Default: project" },
                "title": { "type": "string" },
                "content": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["tenant", "title", "content"],
            "additionalProperties": false
        }),
    )
}

/// Defines the remediation feedback tool.
pub fn remediation_feedback_tool() -> ToolDefinition {
    tool(
        "remediation_feedback",
        "Rate a remediation with the shared confidence rule",
        json!({
            "type": "object",
            "properties": {
                "remediation_id": { "type": "string" },
                "helpful": { "type": "boolean" }
            },
            "required": ["remediation_id", "helpful"],
            "additionalProperties": false
        }),
    )
}

/// Defines the checkpoint save tool.
pub fn checkpoint_save_tool() -> ToolDefinition {
    tool(
        "checkpoint_save",
        "Save a scrubbed session summary for later resumption",
        json!({
            "type": "object",
            "properties": {
                "tenant": tenant_schema(),
                "session_id": { "type": "string" },
                "label": { "type": "string" },
                "summary": { "type": "string" }
            },
            "required": ["tenant", "session_id", "label", "summary"],
            "additionalProperties": false
        }),
    )
}

/// Defines the checkpoint list tool.
pub fn checkpoint_list_tool() -> ToolDefinition {
    tool(
        "checkpoint_list",
        "List a project's checkpoints, newest first",
        json!({
            "type": "object",
            "properties": {
                "tenant": tenant_schema(),
                "session_id": { "type": "string" },
                "limit": { "type": "integer", "minimum": 1, "description": "Default: 10" }
            },
            "required": ["tenant"],
            "additionalProperties": false
        }),
    )
}

/// Defines the checkpoint resume tool.
pub fn checkpoint_resume_tool() -> ToolDefinition {
    tool(
        "checkpoint_resume",
        "Resume one checkpoint by id, or the best-matching checkpoints that fit a token budget",
        json!({
            "type": "object",
            "properties": {
                "tenant": tenant_schema(),
                "checkpoint_id": { "type": "string" },
                "query": { "type": "string" },
                "token_budget": { "type": "integer", "minimum": 1 },
                "limit": { "type": "integer", "minimum": 1, "maximum": 50 }
            },
            "required": ["tenant", "token_budget"],
            "additionalProperties": false
        }),
    )
}
