//! Session Renderer - Subscribes to a session and renders its events
//!
//! The `SessionRenderer` is an opt-in component that:
//! - Subscribes to a session's progress events
//! - Renders phases, thoughts, tool calls and the outcome to the terminal
//! - Answers input requests from stdin by resuming the session
//!
//! It only talks to the orchestrator, so other front ends (a websocket
//! bridge, a web UI) can replace it.

use std::io;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::{EngineError, EngineResult, ProgressEvent, SessionStatus};
use crate::runtime::{SessionOrchestrator, Subscription};

use super::console::Console;

/// What the renderer should do after one event
#[derive(Debug, Clone, PartialEq)]
pub enum RenderAction {
    /// Keep reading events
    Continue,
    /// Ask the user and resume with the reply
    Ask(String),
    /// The run ended
    Stop,
}

/// Console renderer for one session
///
/// # Example
///
/// ```ignore
/// let session = orchestrator.start_session("skill", "task", mode, config).await?;
/// let renderer = SessionRenderer::new(orchestrator.clone());
/// let status = renderer.run(&session.session_id).await?;
/// ```
pub struct SessionRenderer {
    orchestrator: Arc<SessionOrchestrator>,
    console: Console,
    show_thoughts: bool,
}

impl SessionRenderer {
    /// Create a new renderer
    pub fn new(orchestrator: Arc<SessionOrchestrator>) -> Self {
        Self {
            orchestrator,
            console: Console::new(),
            show_thoughts: true,
        }
    }

    /// Set whether to show thoughts
    pub fn show_thoughts(mut self, show: bool) -> Self {
        self.show_thoughts = show;
        self
    }

    /// Get the underlying console
    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Render one event and decide what comes next
    pub fn render(&self, event: &ProgressEvent) -> RenderAction {
        match event {
            ProgressEvent::Status {
                status,
                thought,
                tool_call,
            } => {
                match (thought, tool_call) {
                    (Some(thought), _) => {
                        if self.show_thoughts {
                            self.console.print_thought(thought);
                        }
                    }
                    (None, Some(tool)) => self.console.print_tool_call(tool),
                    (None, None) => self.console.print_phase(*status),
                }
                RenderAction::Continue
            }
            ProgressEvent::InputRequested { prompt } => {
                self.console.print_question(prompt);
                RenderAction::Ask(prompt.clone())
            }
            ProgressEvent::FinalAnswer { content } => {
                self.console.print_answer(content);
                RenderAction::Stop
            }
            ProgressEvent::Error { message } => {
                self.console.print_error(message);
                RenderAction::Stop
            }
        }
    }

    /// Render a session until it finishes or fails
    ///
    /// Returns the session's final status. Input requests are answered from
    /// stdin; an empty line or closed stdin leaves the session PAUSED.
    pub async fn run(&self, session_id: &Uuid) -> EngineResult<SessionStatus> {
        let mut subscription = self.orchestrator.subscribe(session_id).await?;
        let result = self.drive(session_id, &mut subscription).await;

        self.orchestrator
            .broadcaster()
            .unsubscribe(session_id, subscription.id)
            .await;
        result?;

        self.status(session_id).await
    }

    async fn drive(&self, session_id: &Uuid, subscription: &mut Subscription) -> EngineResult<()> {
        // Events published before we subscribed are gone; the store is not
        if let Some(action) = self.catch_up(session_id).await? {
            if !self.handle(session_id, action).await? {
                return Ok(());
            }
        }

        while let Some(event) = subscription.recv().await {
            if let ProgressEvent::InputRequested { .. } = &event {
                // Already answered during catch-up
                if self.status(session_id).await? != SessionStatus::Paused {
                    continue;
                }
            }

            let action = self.render(&event);
            if !self.handle(session_id, action).await? {
                break;
            }
        }

        Ok(())
    }

    async fn catch_up(&self, session_id: &Uuid) -> EngineResult<Option<RenderAction>> {
        let session = self.orchestrator.get_session(session_id).await?;
        let last = session.last_message().map(|m| m.content.clone()).unwrap_or_default();

        let action = match session.status {
            SessionStatus::Running => None,
            SessionStatus::Paused => Some(self.render(&ProgressEvent::input_requested(last))),
            SessionStatus::Finished => Some(self.render(&ProgressEvent::final_answer(last))),
            SessionStatus::Failed => Some(self.render(&ProgressEvent::error(last))),
        };
        Ok(action)
    }

    /// Returns whether to keep reading events
    async fn handle(&self, session_id: &Uuid, action: RenderAction) -> EngineResult<bool> {
        match action {
            RenderAction::Continue => Ok(true),
            RenderAction::Stop => Ok(false),
            RenderAction::Ask(_) => {
                let reply = self.read_reply().await?;
                if reply.is_empty() {
                    self.console.print_system("No answer given, session left paused");
                    return Ok(false);
                }
                self.orchestrator.resume_session(session_id, &reply).await?;
                Ok(true)
            }
        }
    }

    async fn read_reply(&self) -> EngineResult<String> {
        let console = self.console.clone();
        tokio::task::spawn_blocking(move || console.read_input())
            .await
            .map_err(|e| EngineError::other(format!("input task failed: {}", e)))?
            .or_else(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => Ok(String::new()),
                _ => Err(EngineError::Io(e)),
            })
    }

    async fn status(&self, session_id: &Uuid) -> EngineResult<SessionStatus> {
        Ok(self.orchestrator.get_session(session_id).await?.status)
    }
}
