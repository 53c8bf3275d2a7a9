//! Tool registry and dispatch.
//!
//! # Module Structure
//!
//! - [`definitions`]: JSON Schema for every tool's input
//! - [`handlers`]: execution logic, one submodule per service

mod definitions;
mod handlers;

use crate::observability::{RequestContext, enter_request_context};
use crate::services::ServiceContainer;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

type Handler = fn(&ServiceContainer, Value) -> Result<ToolResult>;

/// Registry of tools bound to one service container.
pub struct ToolRegistry {
    services: Arc<ServiceContainer>,
    tools: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    /// Creates a registry exposing every tool over `services`.
    #[must_use]
    pub fn new(services: Arc<ServiceContainer>) -> Self {
        let tools = definitions::all()
            .into_iter()
            .map(|tool| (tool.name.clone(), tool))
            .collect();
        Self { services, tools }
    }

    /// Returns all tool definitions, sorted by name.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<&ToolDefinition> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Executes a tool under a fresh request id.
    ///
    /// Failures inside the tool come back as an `is_error` result carrying the error
    /// code, the scrubbed message and the request id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] only for an unknown tool name.
    pub fn execute(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let handler = Self::handler(name)
            .filter(|_| self.tools.contains_key(name))
            .ok_or_else(|| Error::Validation(format!("unknown tool: {name}")))?;

        let context = RequestContext::new();
        let request_id = context.request_id().to_string();
        let _context = enter_request_context(context);
        let _span = tracing::info_span!(
            "contextfold.tool.execute",
            tool = name,
            request_id = %request_id
        )
        .entered();

        let start = Instant::now();
        let result = handler(&self.services, arguments);
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("tool_calls_total", "tool" => name.to_string(), "status" => status)
            .increment(1);
        metrics::histogram!("tool_duration_ms", "tool" => name.to_string())
            .record(start.elapsed().as_secs_f64() * 1000.0);

        Ok(result.unwrap_or_else(|e| {
            tracing::warn!(error_code = e.code(), "tool call failed");
            self.error_result(&e, &request_id)
        }))
    }

    fn error_result(&self, error: &Error, request_id: &str) -> ToolResult {
        let body = serde_json::json!({
            "error": error.code(),
            "message": self.services.scrubber().scrub(&error.to_string()),
            "request_id": request_id,
        });
        ToolResult {
            content: vec![ToolContent::Text {
                text: body.to_string(),
            }],
            is_error: true,
        }
    }

    fn handler(name: &str) -> Option<Handler> {
        let handler: Handler = match name {
            "session_start" => handlers::execute_session_start,
            "session_end" => handlers::execute_session_end,
            "branch_create" => handlers::execute_branch_create,
            "branch_return" => handlers::execute_branch_return,
            "branch_status" => handlers::execute_branch_status,
            "branch_usage" => handlers::execute_branch_usage,
            "memory_search" => handlers::execute_memory_search,
            "memory_record" => handlers::execute_memory_record,
            "memory_get" => handlers::execute_memory_get,
            "memory_feedback" => handlers::execute_memory_feedback,
            "memory_outcome" => handlers::execute_memory_outcome,
            "memory_consolidate" => handlers::execute_memory_consolidate,
            "memory_consolidate_session" => handlers::execute_memory_consolidate_session,
            "remediation_search" => handlers::execute_remediation_search,
            "remediation_record" => handlers::execute_remediation_record,
            "remediation_feedback" => handlers::execute_remediation_feedback,
            "checkpoint_save" => handlers::execute_checkpoint_save,
            "checkpoint_list" => handlers::execute_checkpoint_list,
            "checkpoint_resume" => handlers::execute_checkpoint_resume,
            _ => return None,
        };
        Some(handler)
    }
}

/// Definition of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for input validation.
    pub input_schema: Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the result represents an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Concatenated text content.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content types that can be returned by tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}
