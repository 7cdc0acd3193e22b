//! Gemini API client
//!
//! This module provides a direct HTTP client for the Google Gemini
//! `generateContent` endpoint. The agent loop only needs plain text
//! completions, so requests carry a single user turn.
//!
//! # Authentication
//!
//! Uses a Gemini API key (set via `GEMINI_API_KEY` or `GOOGLE_API_KEY`, or
//! passed directly).
//!
//! ```ignore
//! // From environment variables
//! let llm = GeminiProvider::from_env()?;
//!
//! // With explicit API key
//! let llm = GeminiProvider::new("AIza...").with_model(FAST_MODEL);
//! ```

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;

use super::provider::LlmProvider;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Model used for the fast tier
pub const FAST_MODEL: &str = "gemini-3-flash-preview";
/// Model used for the advanced tier
pub const ADVANCED_MODEL: &str = "gemini-3-pro-preview";

// ============================================================================
// Gemini-specific request/response types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    #[allow(dead_code)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

impl GeminiResponse {
    /// Concatenate the text parts of the first candidate, skipping thoughts
    fn into_text(self) -> Result<String> {
        let candidate = self
            .candidates
            .and_then(|c| c.into_iter().next())
            .context("No candidates in Gemini response")?;

        if let Some(reason) = &candidate.finish_reason {
            tracing::debug!("[Gemini] Finish reason: {}", reason);
        }

        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|part| part.thought != Some(true))
            .filter_map(|part| part.text)
            .collect();

        Ok(text)
    }
}

// ============================================================================
// GeminiProvider
// ============================================================================

/// Google Gemini LLM provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    stop_sequences: Vec<String>,
    api_base: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider from environment variables
    ///
    /// Reads from:
    /// - `GEMINI_API_KEY` or `GOOGLE_API_KEY` (required)
    /// - `GEMINI_MODEL` (optional, defaults to the fast tier model)
    /// - `GEMINI_MAX_TOKENS` (optional, defaults to 8192)
    pub fn from_env() -> Result<Self> {
        tracing::info!("Creating Gemini provider from environment");

        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .context("GEMINI_API_KEY or GOOGLE_API_KEY environment variable not set")?;

        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| FAST_MODEL.to_string());

        let max_tokens = env::var("GEMINI_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        tracing::info!("Using model: {}", model);
        tracing::info!("Max tokens: {}", max_tokens);

        Ok(Self::new(api_key)
            .with_model(model)
            .with_max_tokens(max_tokens))
    }

    /// Create a new Gemini provider with a specific API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: FAST_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            stop_sequences: Vec::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the max tokens for responses
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Stop generation at any of these sequences
    ///
    /// ReAct prompts usually stop at `"\nObservation:"` so the model does not
    /// invent tool output.
    pub fn with_stop_sequences(mut self, stops: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.stop_sequences = stops.into_iter().map(Into::into).collect();
        self
    }

    /// Override the API base URL (proxies, tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Create a variant with a different model, sharing the same credentials
    pub fn variant(&self, model: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            model: model.into(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stop_sequences: self.stop_sequences.clone(),
            api_base: self.api_base.clone(),
        }
    }

    /// Build the API URL for a given operation
    fn api_url(&self, operation: &str) -> String {
        format!("{}/models/{}:{}", self.api_base, self.model, operation)
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                    thought: None,
                }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(self.max_tokens),
                temperature: self.temperature,
                stop_sequences: self.stop_sequences.clone(),
            }),
        }
    }

    /// Send a non-streaming request to the Gemini API
    async fn send_gemini_request(&self, request: &GeminiRequest) -> Result<GeminiResponse> {
        let url = self.api_url("generateContent");

        let request_json =
            serde_json::to_string(request).context("Failed to serialize Gemini request")?;
        tracing::debug!("[Gemini] Request JSON: {}", request_json);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .body(request_json)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read Gemini response body")?;

        tracing::debug!("[Gemini] Response status: {}", status);
        tracing::debug!("[Gemini] Response body: {}", response_text);

        if !status.is_success() {
            tracing::error!("[Gemini] API error: {} - {}", status, response_text);
            anyhow::bail!("Gemini API error ({}): {}", status, response_text);
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&response_text)
            .context("Failed to parse Gemini API response")?;

        Ok(gemini_response)
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_base", &self.api_base)
            .finish()
    }
}

// ============================================================================
// LlmProvider implementation
// ============================================================================

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        tracing::info!("[Gemini] Sending completion request ({})", self.model);

        let request = self.build_request(prompt);
        let response = self.send_gemini_request(&request).await?;
        response.into_text()
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
