//! Progress events streamed to session observers

use serde::{Deserialize, Serialize};

use super::state::LoopPhase;

/// Events broadcast FROM a session run
///
/// Serialized as `{"event": "...", "payload": {...}}`, which is also the
/// outgoing frame shape of the stream transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Loop progress (for progress indicators)
    #[serde(alias = "status_update")]
    Status {
        /// Current loop phase
        status: LoopPhase,
        /// Thought extracted from the latest completion
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
        /// Tool being dispatched
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call: Option<String>,
    },

    /// The run paused and needs an answer from the user
    #[serde(alias = "request_input")]
    InputRequested {
        /// Question to show the user
        prompt: String,
    },

    /// The run produced its answer
    FinalAnswer {
        /// Answer text
        content: String,
    },

    /// The run failed
    Error {
        /// Human-readable message
        message: String,
    },
}

impl ProgressEvent {
    /// Create a status event for a phase
    pub fn status(phase: LoopPhase) -> Self {
        ProgressEvent::Status {
            status: phase,
            thought: None,
            tool_call: None,
        }
    }

    /// Create a thinking status event carrying a thought
    pub fn thought(thought: impl Into<String>) -> Self {
        ProgressEvent::Status {
            status: LoopPhase::Thinking,
            thought: Some(thought.into()),
            tool_call: None,
        }
    }

    /// Create an acting status event for a tool call
    pub fn tool_call(tool_name: impl Into<String>) -> Self {
        let tool_name = tool_name.into();
        ProgressEvent::Status {
            status: LoopPhase::Acting,
            thought: Some(format!("Calling tool: {}", tool_name)),
            tool_call: Some(tool_name),
        }
    }

    /// Create an input request event
    pub fn input_requested(prompt: impl Into<String>) -> Self {
        ProgressEvent::InputRequested {
            prompt: prompt.into(),
        }
    }

    /// Create a final answer event
    pub fn final_answer(content: impl Into<String>) -> Self {
        ProgressEvent::FinalAnswer {
            content: content.into(),
        }
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            message: message.into(),
        }
    }

    /// Check if no further events follow for the current run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Status { .. })
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::Status { .. } => "status",
            ProgressEvent::InputRequested { .. } => "input_requested",
            ProgressEvent::FinalAnswer { .. } => "final_answer",
            ProgressEvent::Error { .. } => "error",
        }
    }
}
