//! Reasoning steps and the scratchpad fed back into each prompt
//!
//! Steps only live for the duration of a run. When a paused session is
//! resumed with [`ResumeStrategy::RestoreScratchpad`](crate::config::ResumeStrategy),
//! they are rebuilt from the persisted message history.

use crate::session::message::{META_ACTION, META_ACTION_INPUT, META_FINAL, META_THOUGHT};
use crate::session::{Message, MessageRole};

/// One think/act/observe iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningStep {
    /// The thought, or the raw completion when no action was parsed
    pub thought: String,
    /// Tool name, if the step called a tool
    pub tool: Option<String>,
    /// Tool input, if the step called a tool
    pub tool_input: Option<String>,
    /// Tool output or error text
    pub observation: Option<String>,
}

impl ReasoningStep {
    /// A step that called a tool
    pub fn action(
        thought: impl Into<String>,
        tool: impl Into<String>,
        tool_input: impl Into<String>,
    ) -> Self {
        Self {
            thought: thought.into(),
            tool: Some(tool.into()),
            tool_input: Some(tool_input.into()),
            observation: None,
        }
    }

    /// A step that produced neither an action nor a final answer
    pub fn unstructured(text: impl Into<String>) -> Self {
        Self {
            thought: text.into(),
            tool: None,
            tool_input: None,
            observation: None,
        }
    }

    /// Record the tool's observation
    pub fn observe(&mut self, observation: impl Into<String>) {
        self.observation = Some(observation.into());
    }

    fn render_into(&self, out: &mut String) {
        let Some(tool) = &self.tool else {
            out.push('\n');
            out.push_str(&self.thought);
            return;
        };

        if !self.thought.is_empty() {
            out.push_str("\nThought: ");
            out.push_str(&self.thought);
        }
        out.push_str("\nAction: ");
        out.push_str(tool);
        out.push_str("\nAction Input: ");
        out.push_str(self.tool_input.as_deref().unwrap_or_default());
        if let Some(observation) = &self.observation {
            out.push_str("\nObservation: ");
            out.push_str(observation);
        }
    }
}

/// Accumulated reasoning for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scratchpad {
    steps: Vec<ReasoningStep>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: ReasoningStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Text substituted for `{agent_scratchpad}`
    pub fn render(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            step.render_into(&mut out);
        }
        out
    }

    /// Rebuild the steps recorded in a session's history
    ///
    /// Agent messages carrying an action open a step and the following tool
    /// message closes it. For an interrupted step the user's reply becomes
    /// the observation. Final answers and system notes are skipped.
    pub fn restore(history: &[Message]) -> Self {
        let mut pad = Scratchpad::new();
        let mut awaiting_reply = false;

        // The first human message is the task itself
        let mut seen_task = false;

        for message in history {
            match message.role {
                MessageRole::Agent if message.is_input_request() => {
                    awaiting_reply = pad.open_step().is_some();
                }
                MessageRole::Agent if message.meta_flag(META_FINAL) => {}
                MessageRole::Agent => match message.meta_str(META_ACTION) {
                    Some(tool) => pad.push(ReasoningStep::action(
                        message.meta_str(META_THOUGHT).unwrap_or_default(),
                        tool,
                        message.meta_str(META_ACTION_INPUT).unwrap_or_default(),
                    )),
                    None => pad.push(ReasoningStep::unstructured(message.content.clone())),
                },
                MessageRole::Tool => {
                    if let Some(step) = pad.open_step() {
                        step.observe(message.content.clone());
                    }
                }
                MessageRole::Human if !seen_task => seen_task = true,
                MessageRole::Human => {
                    if awaiting_reply {
                        if let Some(step) = pad.open_step() {
                            step.observe(message.content.clone());
                        }
                        awaiting_reply = false;
                    }
                }
                MessageRole::System => {}
            }
        }

        pad
    }

    /// The last step if it called a tool and has no observation yet
    fn open_step(&mut self) -> Option<&mut ReasoningStep> {
        self.steps
            .last_mut()
            .filter(|step| step.tool.is_some() && step.observation.is_none())
    }
}
