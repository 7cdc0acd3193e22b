//! Engine and session configuration
//!
//! `EngineConfig` holds the process-wide knobs (admission cap, step budget,
//! storage location, timeouts). `SessionConfig` holds the typed per-session
//! options a caller may pass when starting a session.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{EngineError, EngineResult};

/// Default directory for persisted sessions
pub const DEFAULT_STORAGE_DIR: &str = ".skill-executor-data/sessions";

/// Upper bound accepted for any step budget
pub const MAX_STEP_BUDGET: usize = 100;

/// Prefix of the environment variables read by [`EngineConfig::from_env`]
const ENV_PREFIX: &str = "SKILL_ENGINE_";

/// How a resumed run rebuilds its reasoning context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStrategy {
    /// Start a fresh scratchpad from the task plus all clarifications
    #[default]
    Restart,

    /// Rebuild the scratchpad from the persisted reasoning steps
    RestoreScratchpad,
}

impl FromStr for ResumeStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restart" => Ok(ResumeStrategy::Restart),
            "restore_scratchpad" | "restore" => Ok(ResumeStrategy::RestoreScratchpad),
            other => Err(EngineError::invalid_config(format!(
                "unknown resume strategy '{}'",
                other
            ))),
        }
    }
}

/// Process-wide engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of RUNNING or PAUSED sessions
    pub max_concurrent_sessions: usize,

    /// Step budget of one agent loop run
    pub max_steps: usize,

    /// Directory holding one JSON file per session
    pub storage_dir: PathBuf,

    /// Idle time after which a session is swept
    pub session_timeout_secs: u64,

    /// Interval of the expiry sweep
    pub cleanup_interval_secs: u64,

    /// Timeout applied to tools that do not declare their own
    pub tool_timeout_ms: u64,

    /// Bounded send attempt per observer when publishing events
    pub observer_send_timeout_ms: u64,

    /// Context rebuilt on resume
    pub resume_strategy: ResumeStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 5,
            max_steps: 10,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            session_timeout_secs: 30 * 60,
            cleanup_interval_secs: 60,
            tool_timeout_ms: 30_000,
            observer_send_timeout_ms: 250,
            resume_strategy: ResumeStrategy::Restart,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `SKILL_ENGINE_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(v) = env_parse::<usize>("MAX_CONCURRENT_SESSIONS")? {
            config.max_concurrent_sessions = v;
        }
        if let Some(v) = env_parse::<usize>("MAX_STEPS")? {
            config.max_steps = v;
        }
        if let Some(v) = env_var("STORAGE_DIR") {
            config.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<u64>("SESSION_TIMEOUT_SECS")? {
            config.session_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("CLEANUP_INTERVAL_SECS")? {
            config.cleanup_interval_secs = v;
        }
        if let Some(v) = env_parse::<u64>("TOOL_TIMEOUT_MS")? {
            config.tool_timeout_ms = v;
        }
        if let Some(v) = env_parse::<u64>("OBSERVER_SEND_TIMEOUT_MS")? {
            config.observer_send_timeout_ms = v;
        }
        if let Some(v) = env_var("RESUME_STRATEGY") {
            config.resume_strategy = v.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            EngineError::invalid_config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every option is within range
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_concurrent_sessions == 0 {
            return Err(EngineError::invalid_config(
                "max_concurrent_sessions must be at least 1",
            ));
        }
        if self.max_steps == 0 || self.max_steps > MAX_STEP_BUDGET {
            return Err(EngineError::invalid_config(format!(
                "max_steps must be between 1 and {}",
                MAX_STEP_BUDGET
            )));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(EngineError::invalid_config(
                "cleanup_interval_secs must be at least 1",
            ));
        }
        if self.tool_timeout_ms == 0 {
            return Err(EngineError::invalid_config("tool_timeout_ms must be at least 1"));
        }
        Ok(())
    }

    /// Set the admission cap
    pub fn with_max_concurrent_sessions(mut self, max: usize) -> Self {
        self.max_concurrent_sessions = max;
        self
    }

    /// Set the step budget
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    /// Set the storage directory
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Set the idle timeout of the expiry sweep
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the default tool timeout
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the resume strategy
    pub fn with_resume_strategy(mut self, strategy: ResumeStrategy) -> Self {
        self.resume_strategy = strategy;
        self
    }

    /// Idle timeout as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Sweep interval as Duration
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Default tool timeout as Duration
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    /// Observer send timeout as Duration
    pub fn observer_send_timeout(&self) -> Duration {
        Duration::from_millis(self.observer_send_timeout_ms)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, name))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> EngineResult<Option<T>> {
    match env_var(name) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            EngineError::invalid_config(format!("{}{}: cannot parse '{}'", ENV_PREFIX, name, raw))
        }),
        None => Ok(None),
    }
}

/// Typed options supplied when starting a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Pin a specific registered model instead of the skill's tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    /// Override the engine's step budget for this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,

    /// Caller data the engine does not interpret
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl SessionConfig {
    /// Create an empty session configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a model
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Override the step budget
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Check that every option is within range
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(steps) = self.max_steps {
            if steps == 0 || steps > MAX_STEP_BUDGET {
                return Err(EngineError::invalid_config(format!(
                    "max_steps must be between 1 and {}",
                    MAX_STEP_BUDGET
                )));
            }
        }
        if let Some(model) = &self.model_id {
            if model.trim().is_empty() {
                return Err(EngineError::invalid_config("model_id must not be empty"));
            }
        }
        Ok(())
    }

    /// Step budget for this session, falling back to the engine default
    pub fn effective_max_steps(&self, engine_default: usize) -> usize {
        self.max_steps.unwrap_or(engine_default)
    }
}
