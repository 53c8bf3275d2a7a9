//! Tool execution handlers, one submodule per service.

mod branch;
mod checkpoint;
mod memory;
mod remediation;

pub use branch::{
    execute_branch_create, execute_branch_return, execute_branch_status, execute_branch_usage,
    execute_session_end, execute_session_start,
};
pub use checkpoint::{execute_checkpoint_list, execute_checkpoint_resume, execute_checkpoint_save};
pub use memory::{
    execute_memory_consolidate, execute_memory_consolidate_session, execute_memory_feedback,
    execute_memory_get, execute_memory_outcome, execute_memory_record, execute_memory_search,
};
pub use remediation::{
    execute_remediation_feedback, execute_remediation_record, execute_remediation_search,
};

use super::{ToolContent, ToolResult};
use crate::{Error, Result};
use serde::Serialize;

/// Wraps a serializable value as pretty JSON text.
fn json_result<T: Serialize>(value: &T) -> Result<ToolResult> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| Error::backend("serialize_tool_result", e))?;
    Ok(ToolResult {
        content: vec![ToolContent::Text { text }],
        is_error: false,
    })
}
