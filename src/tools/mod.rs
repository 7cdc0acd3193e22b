//! Tool system for the session engine
//!
//! This module provides:
//! - `Tool` trait - Interface for implementing tools
//! - `ToolOutcome` - Observation, interrupt, or error
//! - `ToolRegistry` - Registry that dispatches tools with timeouts
//! - `common` - Built-in tools (request_human_input, code_execution)

mod registry;
mod tool;

/// Built-in tools
pub mod common;

pub use registry::{ToolRegistry, DEFAULT_TOOL_TIMEOUT};
pub use tool::{extract_argument, Tool, ToolOutcome};

pub use common::{CodeExecutionTool, RequestHumanInputTool, REQUEST_HUMAN_INPUT};
