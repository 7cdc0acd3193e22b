//! Skill lookup interface
//!
//! Skill registration and matching live outside the engine. The engine only
//! asks a [`SkillResolver`] which model tier and prompt template a skill uses.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{EngineError, EngineResult};

/// Model tier a skill runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheap, low-latency model for simple skills
    #[default]
    #[serde(alias = "SIMPLE", alias = "simple")]
    Fast,
    /// Stronger model for complex skills
    #[serde(alias = "COMPLEX", alias = "complex")]
    Advanced,
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTier::Fast => write!(f, "fast"),
            ModelTier::Advanced => write!(f, "advanced"),
        }
    }
}

/// What the engine needs to know about a skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillProfile {
    /// Skill identifier
    pub skill_id: String,

    /// Model tier to run on
    #[serde(default)]
    pub tier: ModelTier,

    /// ReAct prompt template (`None` uses the built-in one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl SkillProfile {
    /// Create a profile on the fast tier with the default template
    pub fn new(skill_id: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            tier: ModelTier::Fast,
            prompt_template: None,
        }
    }

    /// Set the model tier
    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.tier = tier;
        self
    }

    /// Set the prompt template
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }
}

/// Resolves a skill reference to its profile
#[async_trait]
pub trait SkillResolver: Send + Sync {
    /// Look up a skill; `EngineError::Skill` when it cannot be resolved
    async fn resolve(&self, skill_id: &str) -> EngineResult<SkillProfile>;
}

/// In-memory resolver backed by a fixed map
///
/// Unknown skills get a default profile unless built with [`strict`](Self::strict).
#[derive(Debug, Clone, Default)]
pub struct StaticSkillResolver {
    profiles: HashMap<String, SkillProfile>,
    strict: bool,
}

impl StaticSkillResolver {
    /// Create a resolver that falls back to a default profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver that rejects unknown skills
    pub fn strict() -> Self {
        Self {
            profiles: HashMap::new(),
            strict: true,
        }
    }

    /// Add a profile
    pub fn with_profile(mut self, profile: SkillProfile) -> Self {
        self.insert(profile);
        self
    }

    /// Add or replace a profile
    pub fn insert(&mut self, profile: SkillProfile) {
        self.profiles.insert(profile.skill_id.clone(), profile);
    }
}

#[async_trait]
impl SkillResolver for StaticSkillResolver {
    async fn resolve(&self, skill_id: &str) -> EngineResult<SkillProfile> {
        match self.profiles.get(skill_id) {
            Some(profile) => Ok(profile.clone()),
            None if self.strict => Err(EngineError::Skill(format!("Unknown skill: {}", skill_id))),
            None => {
                tracing::debug!(skill_id, "No profile registered, using defaults");
                Ok(SkillProfile::new(skill_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_aliases() {
        let tier: ModelTier = serde_json::from_str("\"COMPLEX\"").unwrap();
        assert_eq!(tier, ModelTier::Advanced);
        let tier: ModelTier = serde_json::from_str("\"fast\"").unwrap();
        assert_eq!(tier, ModelTier::Fast);
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticSkillResolver::new().with_profile(
            SkillProfile::new("weather")
                .with_tier(ModelTier::Advanced)
                .with_prompt_template("{input}"),
        );

        let profile = resolver.resolve("weather").await.unwrap();
        assert_eq!(profile.tier, ModelTier::Advanced);
        assert_eq!(profile.prompt_template.as_deref(), Some("{input}"));

        let fallback = resolver.resolve("other").await.unwrap();
        assert_eq!(fallback, SkillProfile::new("other"));
    }

    #[tokio::test]
    async fn test_strict_resolver() {
        let resolver = StaticSkillResolver::strict();
        let result = resolver.resolve("missing").await;
        assert!(matches!(result, Err(EngineError::Skill(_))));
    }
}
