//! Prompt templates and run inputs
//!
//! Templates use four placeholders: `{tools}`, `{tool_names}`, `{input}` and
//! `{agent_scratchpad}`. Placeholders are plain text substitutions, so any
//! other braces in a skill's template are left alone.

use crate::config::ResumeStrategy;
use crate::session::Session;

use super::scratchpad::Scratchpad;

/// ReAct template used when a skill does not bring its own
pub const DEFAULT_REACT_TEMPLATE: &str = "Answer the following request as best you can. You have access to the following tools:

{tools}

Use the following format:

Question: the input request you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original request

If anything is ambiguous, use request_human_input to ask the user instead of guessing.

Begin!

Question: {input}
{agent_scratchpad}";

/// A prompt template with the ReAct placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The skill's template, or the default one
    pub fn or_default(template: Option<&str>) -> Self {
        Self::new(template.unwrap_or(DEFAULT_REACT_TEMPLATE))
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Fill in the placeholders
    ///
    /// A template without `{input}` gets the input appended as a
    /// `User Query:` line; one without `{agent_scratchpad}` gets the
    /// scratchpad appended at the end.
    pub fn render(&self, tools: &str, tool_names: &str, input: &str, scratchpad: &str) -> String {
        let mut prompt = self
            .template
            .replace("{tools}", tools)
            .replace("{tool_names}", tool_names);

        let has_scratchpad = prompt.contains("{agent_scratchpad}");

        if prompt.contains("{input}") {
            prompt = prompt.replace("{input}", input);
        } else {
            prompt.push_str("\n\nUser Query: ");
            prompt.push_str(input);
        }

        if has_scratchpad {
            prompt = prompt.replace("{agent_scratchpad}", scratchpad);
        } else {
            prompt.push_str(scratchpad);
        }

        prompt
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_REACT_TEMPLATE)
    }
}

/// What a run starts from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInput {
    /// Text substituted for `{input}`
    pub input: String,
    /// Steps carried over from before a pause
    pub scratchpad: Scratchpad,
}

impl RunInput {
    /// Build the input for the next run of a session
    ///
    /// `Restart` folds every answered clarification into the input and
    /// starts with an empty scratchpad. `RestoreScratchpad` keeps the task
    /// as input and rebuilds the steps from history.
    pub fn for_session(session: &Session, strategy: ResumeStrategy) -> Self {
        let task = session.task().unwrap_or_default();

        match strategy {
            ResumeStrategy::Restart => {
                let mut input = task.to_string();
                let clarifications = session.clarifications();
                if !clarifications.is_empty() {
                    input.push_str("\n\nClarifications from the user:");
                    for (question, answer) in clarifications {
                        input.push_str("\nQ: ");
                        input.push_str(&question);
                        input.push_str("\nA: ");
                        input.push_str(&answer);
                    }
                }
                Self {
                    input,
                    scratchpad: Scratchpad::new(),
                }
            }
            ResumeStrategy::RestoreScratchpad => Self {
                input: task.to_string(),
                scratchpad: Scratchpad::restore(&session.history),
            },
        }
    }
}
