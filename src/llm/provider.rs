//! LLM Provider trait
//!
//! Abstracts the completion endpoint so that different providers (Gemini,
//! test doubles, etc.) can be used interchangeably by the agent loop.

use anyhow::Result;

/// Trait for LLM providers that can drive the agent loop.
///
/// The loop treats a call as a single blocking step from its own point of
/// view: no retries are attempted here, and a failure ends the run.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get the current model name.
    fn model(&self) -> String;

    /// Get the provider name (e.g., "gemini").
    fn provider_name(&self) -> &str;
}
