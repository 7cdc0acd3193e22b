//! Engine error types

use thiserror::Error;

use super::state::SessionStatus;

/// Errors that can occur in the session engine
///
/// Tool failures and human interrupts are deliberately absent: they travel
/// as [`ToolOutcome`](crate::tools::ToolOutcome) values and never abort a run.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Admission refused because the active-session cap is reached
    #[error("Maximum concurrent sessions reached ({limit})")]
    CapacityExceeded {
        /// The configured cap
        limit: usize,
    },

    /// Session not found
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the session's current status
    #[error("Session {id} is {status}, expected PAUSED")]
    InvalidState {
        /// Session ID
        id: String,
        /// Status the session was found in
        status: SessionStatus,
    },

    /// The LLM completion call failed
    #[error("Model call failed: {0}")]
    ModelCall(String),

    /// The skill could not be resolved
    #[error("Skill error: {0}")]
    Skill(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        EngineError::Other(msg.into())
    }

    /// Create a model call error
    pub fn model_call(msg: impl Into<String>) -> Self {
        EngineError::ModelCall(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        EngineError::InvalidConfig(msg.into())
    }

    /// HTTP status class a control surface should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::CapacityExceeded { .. } => 429,
            EngineError::NotFound(_) => 404,
            EngineError::InvalidState { .. } | EngineError::InvalidConfig(_) => 400,
            _ => 500,
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::NotFound("abc123".into());
        assert_eq!(err.to_string(), "Session not found: abc123");

        let err = EngineError::CapacityExceeded { limit: 5 };
        assert_eq!(err.to_string(), "Maximum concurrent sessions reached (5)");

        let err = EngineError::InvalidState {
            id: "s1".into(),
            status: SessionStatus::Running,
        };
        assert_eq!(err.to_string(), "Session s1 is RUNNING, expected PAUSED");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EngineError = io_err.into();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(EngineError::CapacityExceeded { limit: 5 }.http_status(), 429);
        assert_eq!(EngineError::NotFound("x".into()).http_status(), 404);
        assert_eq!(
            EngineError::InvalidState {
                id: "x".into(),
                status: SessionStatus::Finished
            }
            .http_status(),
            400
        );
        assert_eq!(EngineError::model_call("boom").http_status(), 500);
    }
}
