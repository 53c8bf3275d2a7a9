//! Tool surface for agent integrations.
//!
//! Tools take JSON arguments and return JSON text. The transport that carries them is
//! the host's concern.
//!
//! ## Tools
//!
//! - **Sessions and branches**: `session_start`, `session_end`, `branch_create`,
//!   `branch_return`, `branch_status`, `branch_usage`
//! - **Memories**: `memory_search`, `memory_record`, `memory_get`, `memory_feedback`,
//!   `memory_outcome`, `memory_consolidate`, `memory_consolidate_session`
//! - **Remediations**: `remediation_search`, `remediation_record`, `remediation_feedback`
//! - **Checkpoints**: `checkpoint_save`, `checkpoint_list`, `checkpoint_resume`

pub mod tool_types;
mod tools;

pub use tools::{ToolContent, ToolDefinition, ToolRegistry, ToolResult};
