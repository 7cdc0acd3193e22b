//! Model routing
//!
//! Maps a skill's [`ModelTier`] (or an explicitly pinned model name) to the
//! provider that serves it.

use std::collections::HashMap;
use std::sync::Arc;

use super::provider::LlmProvider;
use crate::core::{EngineError, EngineResult};
use crate::skills::ModelTier;

/// Picks a provider per session
#[derive(Clone)]
pub struct ModelRouter {
    fast: Arc<dyn LlmProvider>,
    advanced: Arc<dyn LlmProvider>,
    named: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ModelRouter {
    /// Create a router with one provider per tier
    pub fn new(fast: Arc<dyn LlmProvider>, advanced: Arc<dyn LlmProvider>) -> Self {
        let mut router = Self {
            fast: fast.clone(),
            advanced: advanced.clone(),
            named: HashMap::new(),
        };
        router.insert(fast);
        router.insert(advanced);
        router
    }

    /// Use the same provider for every tier
    pub fn single(provider: Arc<dyn LlmProvider>) -> Self {
        Self::new(provider.clone(), provider)
    }

    /// Register an extra provider that sessions can pin by model name
    pub fn with_model(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.insert(provider);
        self
    }

    fn insert(&mut self, provider: Arc<dyn LlmProvider>) {
        self.named.insert(provider.model(), provider);
    }

    /// Provider for a tier
    pub fn for_tier(&self, tier: ModelTier) -> Arc<dyn LlmProvider> {
        match tier {
            ModelTier::Fast => self.fast.clone(),
            ModelTier::Advanced => self.advanced.clone(),
        }
    }

    /// Resolve the provider for a session
    ///
    /// A pinned `model_id` wins over the tier and must name a registered model.
    pub fn resolve(&self, tier: ModelTier, model_id: Option<&str>) -> EngineResult<Arc<dyn LlmProvider>> {
        match model_id {
            Some(model) => self.named.get(model).cloned().ok_or_else(|| {
                EngineError::invalid_config(format!("Unknown model: {}", model))
            }),
            None => Ok(self.for_tier(tier)),
        }
    }

    /// Names of all registered models
    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.named.keys().cloned().collect();
        models.sort();
        models
    }
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("fast", &self.fast.model())
            .field("advanced", &self.advanced.model())
            .field("models", &self.models())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;

    fn router() -> ModelRouter {
        ModelRouter::new(
            Arc::new(ScriptedLlm::named("flash", Vec::<String>::new())),
            Arc::new(ScriptedLlm::named("pro", Vec::<String>::new())),
        )
        .with_model(Arc::new(ScriptedLlm::named("experimental", Vec::<String>::new())))
    }

    #[test]
    fn test_resolve_by_tier() {
        let router = router();
        assert_eq!(router.resolve(ModelTier::Fast, None).unwrap().model(), "flash");
        assert_eq!(router.resolve(ModelTier::Advanced, None).unwrap().model(), "pro");
    }

    #[test]
    fn test_pinned_model_wins() {
        let router = router();
        let provider = router.resolve(ModelTier::Fast, Some("experimental")).unwrap();
        assert_eq!(provider.model(), "experimental");
        assert_eq!(router.models(), vec!["experimental", "flash", "pro"]);
    }

    #[test]
    fn test_unknown_pinned_model() {
        let result = router().resolve(ModelTier::Fast, Some("nope"));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }
}
