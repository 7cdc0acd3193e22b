//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::llm::LlmProvider;
use crate::tools::{Tool, ToolOutcome};

/// Replays canned completions in order and records every prompt
pub struct ScriptedLlm {
    model: String,
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::named("scripted", responses)
    }

    pub fn named(model: &str, responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            model: model.to_string(),
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted"))
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

type Responder = dyn Fn(&str) -> Result<String> + Send + Sync;

/// Answers each prompt with a closure
pub struct FnLlm {
    responder: Box<Responder>,
}

impl FnLlm {
    pub fn new(responder: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
        }
    }

    /// Always returns the same completion
    pub fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Asks the user once, then answers with whatever they said
    ///
    /// The restart strategy puts answers into the input as `A: ...` lines.
    pub fn asks_then_echoes(question: &str) -> Self {
        let question = question.to_string();
        Self::new(move |prompt| {
            match prompt.lines().rev().find_map(|line| line.strip_prefix("A: ")) {
                Some(answer) => Ok(format!("Thought: I have my answer\nFinal Answer: You chose {}", answer)),
                None => Ok(format!(
                    "Thought: I need to ask\nAction: request_human_input\nAction Input: {}",
                    question
                )),
            }
        })
    }
}

#[async_trait]
impl LlmProvider for FnLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        (self.responder)(prompt)
    }

    fn model(&self) -> String {
        "fn".to_string()
    }

    fn provider_name(&self) -> &str {
        "fn"
    }
}

/// Holds every completion until the gate has a permit
///
/// `gate.add_permits(1)` opens it for good; a gate that is never opened
/// keeps runs RUNNING.
pub struct GatedLlm {
    inner: Arc<dyn LlmProvider>,
    gate: Arc<Semaphore>,
}

impl GatedLlm {
    pub fn new(inner: Arc<dyn LlmProvider>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                inner,
                gate: gate.clone(),
            },
            gate,
        )
    }
}

#[async_trait]
impl LlmProvider for GatedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let _permit = self.gate.acquire().await?;
        self.inner.complete(prompt).await
    }

    fn model(&self) -> String {
        self.inner.model()
    }

    fn provider_name(&self) -> &str {
        "gated"
    }
}

/// Tool that always fails
pub struct FailingTool {
    name: String,
    message: String,
}

impl FailingTool {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn invoke(&self, _input: &str) -> Result<ToolOutcome> {
        Err(anyhow!("{}", self.message))
    }
}

/// Tool that sleeps before answering
pub struct SlowTool {
    name: String,
    delay: Duration,
}

impl SlowTool {
    pub fn new(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Sleeps"
    }

    async fn invoke(&self, _input: &str) -> Result<ToolOutcome> {
        tokio::time::sleep(self.delay).await;
        Ok(ToolOutcome::observation("woke up"))
    }
}

/// Tool that returns a fixed observation
pub struct StaticTool {
    name: String,
    output: String,
}

impl StaticTool {
    pub fn new(name: &str, output: &str) -> Self {
        Self {
            name: name.to_string(),
            output: output.to_string(),
        }
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Returns a fixed value"
    }

    async fn invoke(&self, _input: &str) -> Result<ToolOutcome> {
        Ok(ToolOutcome::observation(self.output.clone()))
    }
}
