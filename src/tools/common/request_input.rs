//! Human input tool
//!
//! Lets the agent ask the user a question. The tool never answers itself:
//! it returns [`ToolOutcome::Interrupt`] and the agent loop either pauses
//! the session (interactive) or fails it (autonomous).

use anyhow::Result;
use async_trait::async_trait;

use super::super::tool::{extract_argument, Tool, ToolOutcome};

/// Name the agent uses to request clarification
pub const REQUEST_HUMAN_INPUT: &str = "request_human_input";

/// Tool that raises a human interrupt
pub struct RequestHumanInputTool;

impl RequestHumanInputTool {
    /// Create a new request tool
    pub fn new() -> Self {
        Self
    }
}

impl Default for RequestHumanInputTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for RequestHumanInputTool {
    fn name(&self) -> &str {
        REQUEST_HUMAN_INPUT
    }

    fn description(&self) -> &str {
        "Use this tool when you need clarification or more information from the human to proceed. Input: the question to ask."
    }

    async fn invoke(&self, input: &str) -> Result<ToolOutcome> {
        match extract_argument(input, &["prompt", "question"]) {
            Some(prompt) => {
                tracing::info!("Human input requested: {}", prompt);
                Ok(ToolOutcome::interrupt(prompt))
            }
            None => Ok(ToolOutcome::error("Missing 'prompt' parameter")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_raw_prompt() {
        let tool = RequestHumanInputTool::new();
        let outcome = tool.invoke("Which color do you prefer?").await.unwrap();
        assert_eq!(outcome, ToolOutcome::interrupt("Which color do you prefer?"));
    }

    #[tokio::test]
    async fn test_json_prompt() {
        let tool = RequestHumanInputTool::new();
        let outcome = tool
            .invoke(r#"{"question": "Which color do you prefer?"}"#)
            .await
            .unwrap();
        assert_eq!(outcome, ToolOutcome::interrupt("Which color do you prefer?"));
    }

    #[tokio::test]
    async fn test_empty_prompt() {
        let tool = RequestHumanInputTool::new();
        let outcome = tool.invoke("").await.unwrap();
        assert!(outcome.is_error());
    }
}
