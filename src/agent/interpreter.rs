//! Step Interpreter
//!
//! Turns one ReAct-style completion into a [`ParsedStep`]. Matching is
//! best-effort and never fails:
//!
//! 1. `Final Answer:` wins over any action in the same text.
//! 2. `Thought:` is captured whether or not an action follows.
//! 3. An action needs both an `Action:` name and an `Action Input:` line.

use regex::Regex;

use crate::core::{EngineError, EngineResult};

const FINAL_ANSWER_PATTERN: &str = r"(?s)Final Answer:\s*(.*)";
const THOUGHT_PATTERN: &str = r"(?s)Thought:\s*(.*?)\s*(?:Action:|Final Answer:|$)";
const ACTION_PATTERN: &str =
    r"(?s)Action:[ \t]*([^\n]*?)[ \t]*\r?\n\s*Action Input:[ \t]*(.*?)\s*(?:\nObservation:|$)";

/// A tool call parsed from a completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAction {
    /// Tool name
    pub name: String,
    /// Raw tool input
    pub input: String,
}

/// What a completion asked for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedStep {
    pub thought: Option<String>,
    pub action: Option<ParsedAction>,
    pub final_answer: Option<String>,
}

impl ParsedStep {
    /// Neither a final answer nor an action was found
    pub fn is_unstructured(&self) -> bool {
        self.final_answer.is_none() && self.action.is_none()
    }
}

/// Compiled matchers for ReAct completions
#[derive(Debug, Clone)]
pub struct StepInterpreter {
    final_answer: Regex,
    thought: Regex,
    action: Regex,
}

impl StepInterpreter {
    /// Compile the matchers
    pub fn new() -> EngineResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| EngineError::other(format!("Invalid step pattern: {}", e)))
        };

        Ok(Self {
            final_answer: compile(FINAL_ANSWER_PATTERN)?,
            thought: compile(THOUGHT_PATTERN)?,
            action: compile(ACTION_PATTERN)?,
        })
    }

    /// Interpret one completion
    pub fn interpret(&self, text: &str) -> ParsedStep {
        let thought = self
            .thought
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty());

        let final_answer = self
            .final_answer
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string());

        // Final answer takes precedence over any action
        let action = if final_answer.is_some() {
            None
        } else {
            self.action.captures(text).and_then(|c| {
                let name = c.get(1)?.as_str().trim();
                let input = c.get(2)?.as_str().trim();
                if name.is_empty() {
                    return None;
                }
                Some(ParsedAction {
                    name: name.to_string(),
                    input: input.to_string(),
                })
            })
        };

        ParsedStep {
            thought,
            action,
            final_answer,
        }
    }
}
