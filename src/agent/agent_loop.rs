//! Agent Loop
//!
//! Drives one run of a session through the think/act/observe cycle:
//!
//! 1. Render the prompt (template, tool catalogue, scratchpad)
//! 2. Ask the model for a completion
//! 3. Interpret it
//! 4. Finish, dispatch a tool, or keep going on unstructured output
//!
//! Every state change is written to the [`SessionStore`] before the event
//! that announces it is published, so observers never see state that is
//! not yet durable.

use std::sync::Arc;

use uuid::Uuid;

use crate::core::{EngineError, EngineResult, ExecutionMode, LoopPhase, ProgressEvent, SessionStatus};
use crate::llm::LlmProvider;
use crate::runtime::EventBroadcaster;
use crate::session::message::{
    META_ACTION, META_ACTION_INPUT, META_FINAL, META_INPUT_REQUEST, META_STEP, META_THOUGHT,
    META_TOOL,
};
use crate::session::{Message, SessionStore};
use crate::tools::{ToolOutcome, ToolRegistry};

use super::config::AgentConfig;
use super::interpreter::StepInterpreter;
use super::prompt::RunInput;
use super::scratchpad::{ReasoningStep, Scratchpad};

/// Failure reason when the step budget runs out
pub const MAX_STEPS_MESSAGE: &str = "Max steps reached without final answer.";

/// Failure reason for an interrupt in autonomous mode
pub fn ambiguity_message(prompt: &str) -> String {
    format!("Ambiguity encountered in autonomous mode: {}", prompt)
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The session is FINISHED with this answer
    Finished { answer: String },
    /// The session is PAUSED waiting for an answer to this prompt
    Paused { prompt: String },
    /// The session is FAILED
    Failed { reason: String },
}

/// Shared services every run needs
#[derive(Clone)]
pub struct LoopServices {
    pub store: Arc<SessionStore>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub tools: Arc<ToolRegistry>,
    pub interpreter: Arc<StepInterpreter>,
}

/// One run of the reasoning loop for one session
pub struct AgentLoop {
    session_id: Uuid,
    services: LoopServices,
    llm: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl AgentLoop {
    pub fn new(
        session_id: Uuid,
        services: LoopServices,
        llm: Arc<dyn LlmProvider>,
        config: AgentConfig,
    ) -> Self {
        Self {
            session_id,
            services,
            llm,
            config,
        }
    }

    /// Run until the session finishes, pauses, or fails
    ///
    /// Model and storage errors end the run as FAILED (with an `error`
    /// event). `Err` is only returned when even that write-back fails.
    pub async fn run(&self, input: RunInput) -> EngineResult<RunOutcome> {
        let RunInput {
            input,
            mut scratchpad,
        } = input;

        tracing::info!(
            session_id = %self.session_id,
            model = %self.llm.model(),
            mode = %self.config.mode,
            max_steps = self.config.max_steps,
            restored_steps = scratchpad.len(),
            "[AgentLoop] Starting run"
        );

        match self.run_steps(&input, &mut scratchpad).await {
            Ok(outcome) => {
                tracing::info!(session_id = %self.session_id, outcome = ?outcome, "[AgentLoop] Run ended");
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(session_id = %self.session_id, error = %e, "[AgentLoop] Run aborted");
                self.fail(e.to_string()).await
            }
        }
    }

    async fn run_steps(&self, input: &str, scratchpad: &mut Scratchpad) -> EngineResult<RunOutcome> {
        let tools = self.services.tools.describe();
        let tool_names = self.services.tools.tool_names().join(", ");
        let max_steps = self.config.max_steps;

        for step in 0..max_steps {
            let is_last = step + 1 == max_steps;

            self.publish(ProgressEvent::status(LoopPhase::Thinking)).await;

            let prompt = self
                .config
                .template
                .render(&tools, &tool_names, input, &scratchpad.render());
            tracing::debug!(session_id = %self.session_id, step, "[AgentLoop] Prompt: {} chars", prompt.len());

            let completion = self
                .llm
                .complete(&prompt)
                .await
                .map_err(|e| EngineError::model_call(format!("{:#}", e)))?;
            tracing::debug!(session_id = %self.session_id, step, "[AgentLoop] Completion: {}", completion);

            let parsed = self.services.interpreter.interpret(&completion);

            if let Some(answer) = parsed.final_answer {
                return self.finish(step, parsed.thought, answer).await;
            }

            if let Some(action) = parsed.action {
                let thought = parsed.thought.unwrap_or_default();

                let record = Message::agent(self.session_id, completion.trim())
                    .with_meta(META_STEP, step)
                    .with_meta(META_THOUGHT, thought.clone())
                    .with_meta(META_ACTION, action.name.clone())
                    .with_meta(META_ACTION_INPUT, action.input.clone());
                self.services.store.append(&self.session_id, record).await?;

                if !thought.is_empty() {
                    self.publish(ProgressEvent::thought(thought.clone())).await;
                }
                self.publish(ProgressEvent::tool_call(action.name.clone())).await;

                tracing::info!(session_id = %self.session_id, step, tool = %action.name, "[AgentLoop] Dispatching tool");
                let outcome = self
                    .services
                    .tools
                    .dispatch(&action.name, &action.input)
                    .await;

                let observation = match outcome {
                    ToolOutcome::Interrupt { prompt } => {
                        return self.interrupt(step, &action.name, prompt).await;
                    }
                    other => other.observation_text().unwrap_or_default(),
                };

                let record = Message::tool(self.session_id, &action.name, observation.clone())
                    .with_meta(META_STEP, step);
                self.services.store.append(&self.session_id, record).await?;
                self.publish(ProgressEvent::status(LoopPhase::Observing)).await;

                let mut reasoning = ReasoningStep::action(thought, action.name, action.input);
                reasoning.observe(observation);
                scratchpad.push(reasoning);
                continue;
            }

            // Neither marker: tolerate format drift
            let text = completion.trim().to_string();
            if is_last {
                tracing::warn!(session_id = %self.session_id, step, "[AgentLoop] No markers on last step, using raw completion");
                return self.finish(step, parsed.thought, text).await;
            }

            let record = Message::agent(self.session_id, text.clone()).with_meta(META_STEP, step);
            self.services.store.append(&self.session_id, record).await?;
            if let Some(thought) = parsed.thought {
                self.publish(ProgressEvent::thought(thought)).await;
            }
            scratchpad.push(ReasoningStep::unstructured(text));
        }

        tracing::warn!(session_id = %self.session_id, max_steps, "[AgentLoop] Step budget exhausted");
        self.fail(MAX_STEPS_MESSAGE.to_string()).await
    }

    async fn finish(
        &self,
        step: usize,
        thought: Option<String>,
        answer: String,
    ) -> EngineResult<RunOutcome> {
        let mut record = Message::agent(self.session_id, answer.clone())
            .with_meta(META_STEP, step)
            .with_meta(META_FINAL, true);
        if let Some(thought) = &thought {
            record = record.with_meta(META_THOUGHT, thought.clone());
        }

        self.services
            .store
            .set_status(&self.session_id, SessionStatus::Finished, Some(record))
            .await?;

        if let Some(thought) = thought {
            self.publish(ProgressEvent::thought(thought)).await;
        }
        self.publish(ProgressEvent::final_answer(answer.clone())).await;

        Ok(RunOutcome::Finished { answer })
    }

    async fn interrupt(&self, step: usize, tool: &str, prompt: String) -> EngineResult<RunOutcome> {
        match self.config.mode {
            ExecutionMode::Autonomous => {
                tracing::warn!(session_id = %self.session_id, tool, "[AgentLoop] Interrupt in autonomous mode");
                self.fail(ambiguity_message(&prompt)).await
            }
            ExecutionMode::Interactive => {
                let record = Message::agent(self.session_id, prompt.clone())
                    .with_meta(META_STEP, step)
                    .with_meta(META_INPUT_REQUEST, true)
                    .with_meta(META_TOOL, tool);

                self.services
                    .store
                    .set_status(&self.session_id, SessionStatus::Paused, Some(record))
                    .await?;

                tracing::info!(session_id = %self.session_id, tool, "[AgentLoop] Paused for input");
                self.publish(ProgressEvent::input_requested(prompt.clone())).await;

                Ok(RunOutcome::Paused { prompt })
            }
        }
    }

    async fn fail(&self, reason: String) -> EngineResult<RunOutcome> {
        let record = Message::system(self.session_id, reason.clone());
        self.services
            .store
            .set_status(&self.session_id, SessionStatus::Failed, Some(record))
            .await?;

        self.publish(ProgressEvent::error(reason.clone())).await;

        Ok(RunOutcome::Failed { reason })
    }

    async fn publish(&self, event: ProgressEvent) {
        self.services
            .broadcaster
            .publish(&self.session_id, event)
            .await;
    }
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("session_id", &self.session_id)
            .field("model", &self.llm.model())
            .field("config", &self.config)
            .finish()
    }
}
