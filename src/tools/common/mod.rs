//! Built-in tools
//!
//! - `RequestHumanInputTool` - Ask the user for clarification
//! - `CodeExecutionTool` - Run a code snippet in a subprocess

pub mod code_execution;
pub mod request_input;

pub use code_execution::CodeExecutionTool;
pub use request_input::{RequestHumanInputTool, REQUEST_HUMAN_INPUT};
