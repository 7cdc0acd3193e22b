//! Code execution tool
//!
//! Runs a Python snippet in a subprocess and returns what it printed.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use super::super::tool::{Tool, ToolOutcome};

/// Default timeout in milliseconds (30 seconds)
const DEFAULT_TIMEOUT_MS: u64 = 30000;
/// Maximum output length in bytes
const MAX_OUTPUT_LENGTH: usize = 30000;

/// Tool that executes code snippets
pub struct CodeExecutionTool {
    /// Interpreter program
    program: String,
    /// Flag that passes the snippet inline (`-c`)
    inline_flag: String,
    /// Working directory for the subprocess
    working_dir: String,
    timeout: Duration,
}

/// Structured input for the tool
#[derive(Debug, Deserialize)]
struct CodeInput {
    code: String,
}

impl CodeExecutionTool {
    /// Create a tool that runs snippets with `python3 -c`
    pub fn new() -> Self {
        Self::with_interpreter("python3", "-c")
    }

    /// Create a tool with a custom interpreter
    pub fn with_interpreter(program: impl Into<String>, inline_flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            inline_flag: inline_flag.into(),
            working_dir: ".".to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, working_dir: impl Into<String>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    /// Set the execution timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accepts `{"code": "..."}` or the raw snippet
    fn parse_code(input: &str) -> Option<String> {
        let trimmed = input.trim();
        let code = match serde_json::from_str::<CodeInput>(trimmed) {
            Ok(parsed) => parsed.code,
            Err(_) => strip_fences(trimmed).to_string(),
        };
        Some(code).filter(|c| !c.trim().is_empty())
    }

    /// Run a snippet, returning combined output and the exit code
    async fn run_code(&self, code: &str) -> Result<(String, i32)> {
        tracing::info!("Executing code with {}", self.program);
        tracing::debug!("Working directory: {}", self.working_dir);
        tracing::debug!("Timeout: {}ms", self.timeout.as_millis());

        let output_future = Command::new(&self.program)
            .arg(&self.inline_flag)
            .arg(code)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.timeout, output_future).await {
            Ok(result) => result?,
            Err(_) => {
                return Ok((
                    format!("Execution timed out after {}ms", self.timeout.as_millis()),
                    -1,
                ));
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut result = String::new();
        if !stdout.is_empty() {
            result.push_str(&stdout);
        }
        if !stderr.is_empty() {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str("STDERR:\n");
            result.push_str(&stderr);
        }

        if result.len() > MAX_OUTPUT_LENGTH {
            let mut cut = MAX_OUTPUT_LENGTH;
            while !result.is_char_boundary(cut) {
                cut -= 1;
            }
            result.truncate(cut);
            result.push_str("\n... (output truncated)");
        }

        tracing::debug!("Exit code: {}", exit_code);
        tracing::debug!("Output length: {} chars", result.len());

        Ok((result, exit_code))
    }
}

impl Default for CodeExecutionTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop a surrounding markdown code fence, if any
fn strip_fences(input: &str) -> &str {
    let Some(rest) = input.strip_prefix("```") else {
        return input;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[async_trait]
impl Tool for CodeExecutionTool {
    fn name(&self) -> &str {
        "code_execution"
    }

    fn description(&self) -> &str {
        "Execute a Python code snippet and return its printed output. Input: the code, or {\"code\": \"...\"}."
    }

    fn timeout(&self) -> Option<Duration> {
        // Leave room for the subprocess timeout to report first
        Some(self.timeout + Duration::from_secs(1))
    }

    async fn invoke(&self, input: &str) -> Result<ToolOutcome> {
        let Some(code) = Self::parse_code(input) else {
            return Ok(ToolOutcome::error("Missing 'code' parameter"));
        };

        match self.run_code(&code).await {
            Ok((output, 0)) => {
                if output.is_empty() {
                    Ok(ToolOutcome::observation("Code executed successfully (no output)"))
                } else {
                    Ok(ToolOutcome::observation(output))
                }
            }
            Ok((output, exit_code)) => Ok(ToolOutcome::error(format!(
                "Execution failed with exit code {}\n{}",
                exit_code, output
            ))),
            Err(e) => Ok(ToolOutcome::error(format!("Failed to execute code: {}", e))),
        }
    }
}
