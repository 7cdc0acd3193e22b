//! Session and loop state types

use serde::{Deserialize, Serialize};

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// A run is in flight (or scheduled)
    Running,

    /// Waiting for the user to answer an input request
    Paused,

    /// The run produced a final answer
    #[serde(alias = "COMPLETED")]
    Finished,

    /// The run ended without an answer
    Failed,
}

impl SessionStatus {
    /// Check if the session counts against the admission cap
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Paused)
    }

    /// Check if the session reached a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Finished | SessionStatus::Failed)
    }

    /// Wire name of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "RUNNING",
            SessionStatus::Paused => "PAUSED",
            SessionStatus::Finished => "FINISHED",
            SessionStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a session reacts when a tool needs clarification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// May pause and ask the user
    #[default]
    #[serde(alias = "HITL")]
    Interactive,

    /// Must never pause; ambiguity fails the run
    Autonomous,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Interactive => write!(f, "INTERACTIVE"),
            ExecutionMode::Autonomous => write!(f, "AUTONOMOUS"),
        }
    }
}

/// Phase of a single agent loop iteration, reported in status events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopPhase {
    /// Awaiting the model completion
    Thinking,

    /// Dispatching a tool call
    #[serde(alias = "TOOL_CALL")]
    Acting,

    /// Tool result available, loop continues
    Observing,
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopPhase::Thinking => write!(f, "THINKING"),
            LoopPhase::Acting => write!(f, "ACTING"),
            LoopPhase::Observing => write!(f, "OBSERVING"),
        }
    }
}
