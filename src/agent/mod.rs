//! The reasoning loop
//!
//! - `AgentLoop` - one think/act/observe run of a session
//! - `StepInterpreter` - parses completions into steps
//! - `Scratchpad` / `ReasoningStep` - per-run reasoning trace
//! - `PromptTemplate` / `RunInput` - what each run starts from

pub mod agent_loop;
pub mod config;
pub mod interpreter;
pub mod prompt;
pub mod scratchpad;

pub use agent_loop::{ambiguity_message, AgentLoop, LoopServices, RunOutcome, MAX_STEPS_MESSAGE};
pub use config::{AgentConfig, DEFAULT_MAX_STEPS};
pub use interpreter::{ParsedAction, ParsedStep, StepInterpreter};
pub use prompt::{PromptTemplate, RunInput, DEFAULT_REACT_TEMPLATE};
pub use scratchpad::{ReasoningStep, Scratchpad};
