//! Session message types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Metadata key: loop iteration a message was produced in
pub const META_STEP: &str = "step";
/// Metadata key: thought extracted from a completion
pub const META_THOUGHT: &str = "thought";
/// Metadata key: tool name of an action
pub const META_ACTION: &str = "action";
/// Metadata key: raw tool input of an action
pub const META_ACTION_INPUT: &str = "action_input";
/// Metadata key: marks the final answer
pub const META_FINAL: &str = "final";
/// Metadata key: marks a question asked to the user
pub const META_INPUT_REQUEST: &str = "input_request";
/// Metadata key: tool that produced an observation
pub const META_TOOL: &str = "tool";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageRole {
    /// The user (task submission, clarification replies)
    Human,
    /// The agent (completions, questions, answers)
    #[serde(alias = "AI")]
    Agent,
    /// The engine itself (failure notes)
    System,
    /// A tool observation
    Tool,
}

/// A single entry of a session's append-only history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub message_id: Uuid,
    /// Owning session
    pub session_id: Uuid,
    /// Author
    pub role: MessageRole,
    /// Text content
    pub content: String,
    /// Arbitrary metadata
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// When the message was appended
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message for a session
    pub fn new(session_id: Uuid, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            session_id,
            role,
            content: content.into(),
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a human message
    pub fn human(session_id: Uuid, content: impl Into<String>) -> Self {
        Self::new(session_id, MessageRole::Human, content)
    }

    /// Create an agent message
    pub fn agent(session_id: Uuid, content: impl Into<String>) -> Self {
        Self::new(session_id, MessageRole::Agent, content)
    }

    /// Create a system message
    pub fn system(session_id: Uuid, content: impl Into<String>) -> Self {
        Self::new(session_id, MessageRole::System, content)
    }

    /// Create a tool observation message
    pub fn tool(session_id: Uuid, tool_name: &str, content: impl Into<String>) -> Self {
        Self::new(session_id, MessageRole::Tool, content).with_meta(META_TOOL, tool_name)
    }

    /// Attach a metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Read a string metadata entry
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Read a boolean metadata flag (absent means false)
    pub fn meta_flag(&self, key: &str) -> bool {
        self.metadata
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Check if this message is a question the agent asked the user
    pub fn is_input_request(&self) -> bool {
        self.role == MessageRole::Agent && self.meta_flag(META_INPUT_REQUEST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_metadata() {
        let id = Uuid::new_v4();
        let msg = Message::agent(id, "Which color?").with_meta(META_INPUT_REQUEST, true);
        assert!(msg.is_input_request());
        assert!(!msg.meta_flag(META_FINAL));

        let obs = Message::tool(id, "search", "42");
        assert_eq!(obs.meta_str(META_TOOL), Some("search"));
        assert_eq!(obs.role, MessageRole::Tool);
    }

    #[test]
    fn test_role_accepts_legacy_name() {
        let role: MessageRole = serde_json::from_str("\"AI\"").unwrap();
        assert_eq!(role, MessageRole::Agent);
    }
}
