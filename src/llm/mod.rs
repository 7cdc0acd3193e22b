//! LLM access for the agent loop
//!
//! - `LlmProvider` - completion interface
//! - `GeminiProvider` - Google Gemini HTTP client
//! - `ModelRouter` - picks a provider for a skill's model tier

pub mod gemini;
pub mod provider;
pub mod router;

pub use gemini::{GeminiProvider, ADVANCED_MODEL, FAST_MODEL};
pub use provider::LlmProvider;
pub use router::ModelRouter;
