//! Tool trait definition
//!
//! All tools implement this trait to provide a consistent interface.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of invoking a tool
///
/// A tool that needs clarification returns `Interrupt` instead of failing;
/// the agent loop decides what that means for the session's mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// Normal output, fed back to the model
    Observation {
        /// Tool output
        output: String,
    },

    /// The tool cannot proceed without the user
    Interrupt {
        /// Question for the user
        prompt: String,
    },

    /// The tool failed; recovered as an observation
    Error {
        /// Failure description
        message: String,
    },
}

impl ToolOutcome {
    /// Create a successful outcome
    pub fn observation(output: impl Into<String>) -> Self {
        ToolOutcome::Observation {
            output: output.into(),
        }
    }

    /// Create an interrupt outcome
    pub fn interrupt(prompt: impl Into<String>) -> Self {
        ToolOutcome::Interrupt {
            prompt: prompt.into(),
        }
    }

    /// Create an error outcome
    pub fn error(message: impl Into<String>) -> Self {
        ToolOutcome::Error {
            message: message.into(),
        }
    }

    /// Check if this outcome is an interrupt
    pub fn is_interrupt(&self) -> bool {
        matches!(self, ToolOutcome::Interrupt { .. })
    }

    /// Check if this outcome is an error
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error { .. })
    }

    /// Text fed back into the scratchpad (`None` for interrupts)
    pub fn observation_text(&self) -> Option<String> {
        match self {
            ToolOutcome::Observation { output } => Some(output.clone()),
            ToolOutcome::Error { message } => Some(format!("Error: {}", message)),
            ToolOutcome::Interrupt { .. } => None,
        }
    }
}

/// Trait for tools that the agent can use
///
/// Input is the raw `Action Input:` text from the model; tools that expect
/// structured arguments can use [`extract_argument`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the name of this tool
    fn name(&self) -> &str;

    /// Get a description of this tool (shown in the tool catalogue)
    fn description(&self) -> &str;

    /// Timeout for one invocation (`None` uses the registry default)
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Invoke the tool
    ///
    /// Errors are converted to [`ToolOutcome::Error`] by the registry.
    async fn invoke(&self, input: &str) -> Result<ToolOutcome>;
}

/// Pull one argument out of free-form tool input
///
/// Accepts a JSON object (first matching key wins), a JSON string, or raw
/// text (surrounding quotes stripped). Returns `None` for empty input.
pub fn extract_argument(input: &str, keys: &[&str]) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => keys
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        Ok(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        _ => {
            let unquoted = trimmed
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(trimmed)
                .trim();
            Some(unquoted.to_string()).filter(|s| !s.is_empty())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_outcome_observation_text() {
        assert_eq!(
            ToolOutcome::observation("output").observation_text(),
            Some("output".to_string())
        );
        assert_eq!(
            ToolOutcome::error("boom").observation_text(),
            Some("Error: boom".to_string())
        );
        assert!(ToolOutcome::interrupt("which?").observation_text().is_none());
        assert!(ToolOutcome::interrupt("which?").is_interrupt());
        assert!(ToolOutcome::error("boom").is_error());
    }

    #[test]
    fn test_extract_argument() {
        let keys = ["prompt", "question"];
        assert_eq!(
            extract_argument(r#"{"question": "Which color?"}"#, &keys),
            Some("Which color?".to_string())
        );
        assert_eq!(
            extract_argument(r#""Which color?""#, &keys),
            Some("Which color?".to_string())
        );
        assert_eq!(
            extract_argument("Which color?", &keys),
            Some("Which color?".to_string())
        );
        assert_eq!(extract_argument(r#"{"other": "x"}"#, &keys), None);
        assert_eq!(extract_argument("   ", &keys), None);
        assert_eq!(extract_argument("42", &keys), Some("42".to_string()));
    }
}
