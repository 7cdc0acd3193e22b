//! Tool registry for managing available tools
//!
//! The registry holds all tools that are available to the agent loop and
//! dispatches invocations with a per-tool timeout. It is built once at
//! startup and shared read-only (`Arc<ToolRegistry>`) across runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::tool::{Tool, ToolOutcome};

/// Default timeout for tools that do not declare one
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry that holds all available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    default_timeout: Duration,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            default_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Set the timeout used for tools without their own
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Register a tool in the registry
    ///
    /// A tool with the same name replaces the previous one.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register an already shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        tracing::info!("Registering tool: {}", name);
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Tool '{}' replaced an existing registration", name);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Invoke a tool by name
    ///
    /// Never fails: an unknown name, a tool error, or an expired timeout all
    /// come back as [`ToolOutcome::Error`] so the loop can observe them.
    pub async fn dispatch(&self, name: &str, input: &str) -> ToolOutcome {
        let Some(tool) = self.tools.get(name) else {
            tracing::warn!(tool = %name, "Tool not found");
            return ToolOutcome::error(format!("Tool {} not found.", name));
        };

        let timeout = tool.timeout().unwrap_or(self.default_timeout);
        tracing::info!(tool = %name, "Executing tool");
        tracing::debug!(tool = %name, "Input: {}", input);

        let outcome = match tokio::time::timeout(timeout, tool.invoke(input)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(tool = %name, error = %e, "Tool failed");
                ToolOutcome::error(e.to_string())
            }
            Err(_) => {
                tracing::warn!(tool = %name, timeout_ms = timeout.as_millis() as u64, "Tool timed out");
                ToolOutcome::error(format!(
                    "Tool {} timed out after {}ms",
                    name,
                    timeout.as_millis()
                ))
            }
        };

        tracing::debug!(
            tool = %name,
            "Tool completed. Is error: {}, interrupt: {}",
            outcome.is_error(),
            outcome.is_interrupt()
        );

        outcome
    }

    /// Tool catalogue for prompts: one `name: description` line per tool
    pub fn describe(&self) -> String {
        self.tool_names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Get the sorted list of tool names
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingTool, SlowTool};
    use crate::tools::RequestHumanInputTool;

    #[test]
    fn test_empty_registry() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.describe(), "");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let registry = ToolRegistry::new();
        let outcome = registry.dispatch("missing", "x").await;
        assert_eq!(outcome, ToolOutcome::error("Tool missing not found."));
    }

    #[tokio::test]
    async fn test_dispatch_converts_errors() {
        let mut registry = ToolRegistry::new();
        registry.register(FailingTool::new("flaky", "disk full"));

        let outcome = registry.dispatch("flaky", "").await;
        assert_eq!(outcome.observation_text(), Some("Error: disk full".to_string()));
    }

    #[tokio::test]
    async fn test_dispatch_timeout() {
        let mut registry = ToolRegistry::new().with_default_timeout(Duration::from_millis(20));
        registry.register(SlowTool::new("slow", Duration::from_secs(5)));

        let outcome = registry.dispatch("slow", "").await;
        assert!(matches!(
            outcome,
            ToolOutcome::Error { ref message } if message.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_dispatch_passes_interrupt_through() {
        let mut registry = ToolRegistry::new();
        registry.register(RequestHumanInputTool::new());

        let outcome = registry
            .dispatch("request_human_input", "Which color do you prefer?")
            .await;
        assert_eq!(outcome, ToolOutcome::interrupt("Which color do you prefer?"));
    }

    #[test]
    fn test_describe_is_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(FailingTool::new("zeta", "x"));
        registry.register(FailingTool::new("alpha", "x"));

        assert_eq!(registry.tool_names(), vec!["alpha", "zeta"]);
        assert!(registry.describe().starts_with("alpha: "));
    }
}
