//! Agent Configuration
//!
//! Per-run options for the [`AgentLoop`](super::AgentLoop).

use crate::core::ExecutionMode;

use super::prompt::PromptTemplate;

/// Default step budget per run
pub const DEFAULT_MAX_STEPS: usize = 10;

/// Configuration for one agent loop run
///
/// Use the builder pattern to configure the loop:
///
/// ```ignore
/// let config = AgentConfig::new(ExecutionMode::Interactive)
///     .with_max_steps(5)
///     .with_template(profile.prompt_template.as_deref());
/// ```
#[derive(Clone)]
pub struct AgentConfig {
    /// How interrupts are handled
    pub mode: ExecutionMode,

    /// Maximum number of model calls in one run
    pub max_steps: usize,

    /// ReAct prompt template
    pub template: PromptTemplate,
}

impl AgentConfig {
    /// Create a configuration for a mode with the default budget and template
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            max_steps: DEFAULT_MAX_STEPS,
            template: PromptTemplate::default(),
        }
    }

    /// Set the step budget
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the prompt template (`None` keeps the default)
    pub fn with_template(mut self, template: Option<&str>) -> Self {
        self.template = PromptTemplate::or_default(template);
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(ExecutionMode::default())
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("mode", &self.mode)
            .field("max_steps", &self.max_steps)
            .field(
                "template",
                &format!("{}...", self.template.as_str().chars().take(50).collect::<String>()),
            )
            .finish()
    }
}
