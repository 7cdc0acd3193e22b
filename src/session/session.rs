//! Session record
//!
//! A `Session` is one user-initiated execution of a skill: identity, target
//! skill, mode, status, typed configuration, timestamps and the ordered
//! message history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::core::{ExecutionMode, SessionStatus};

use super::message::{Message, MessageRole};

/// Canonical session record, owned by the [`SessionStore`](super::SessionStore)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID
    pub session_id: Uuid,

    /// Skill this session executes
    pub skill_id: String,

    /// Interactive or autonomous
    pub mode: ExecutionMode,

    /// Lifecycle status
    pub status: SessionStatus,

    /// Typed per-session options
    #[serde(default)]
    pub config: SessionConfig,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Last mutation; drives the expiry sweep
    pub last_active: DateTime<Utc>,

    /// Append-only message history
    #[serde(default)]
    pub history: Vec<Message>,
}

impl Session {
    /// Create a new running session
    pub fn new(skill_id: impl Into<String>, mode: ExecutionMode, config: SessionConfig) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            skill_id: skill_id.into(),
            mode,
            status: SessionStatus::Running,
            config,
            created_at: now,
            last_active: now,
            history: Vec::new(),
        }
    }

    /// Session ID as a string
    pub fn id(&self) -> String {
        self.session_id.to_string()
    }

    /// Update the last_active timestamp
    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Append a message to the history
    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Append a message with the given role and content
    pub fn push_message(&mut self, role: MessageRole, content: impl Into<String>) {
        let message = Message::new(self.session_id, role, content);
        self.history.push(message);
    }

    /// The task text: the first human message
    pub fn task(&self) -> Option<&str> {
        self.history
            .iter()
            .find(|m| m.role == MessageRole::Human)
            .map(|m| m.content.as_str())
    }

    /// Question/answer pairs from every pause that was answered
    ///
    /// A human message counts as an answer when it follows an agent input
    /// request; the first human message (the task) never does.
    pub fn clarifications(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut pending: Option<&str> = None;

        for message in &self.history {
            if message.is_input_request() {
                pending = Some(message.content.as_str());
            } else if message.role == MessageRole::Human {
                if let Some(question) = pending.take() {
                    pairs.push((question.to_string(), message.content.clone()));
                }
            }
        }

        pairs
    }

    /// The latest message, if any
    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }
}
