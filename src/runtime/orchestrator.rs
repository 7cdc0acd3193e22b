//! SessionOrchestrator - Starts, resumes and tracks session runs
//!
//! The orchestrator is the public entry point of the engine. It is
//! responsible for:
//! - Admission control (the active-session cap)
//! - Creating sessions and scheduling their runs as tokio tasks
//! - Resuming paused sessions with the user's reply
//! - Tracking in-flight runs and shutting them down
//! - Starting the periodic expiry sweep

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::{AgentConfig, AgentLoop, LoopServices, RunInput, StepInterpreter};
use crate::config::{EngineConfig, SessionConfig};
use crate::core::{EngineError, EngineResult, ExecutionMode, ProgressEvent, SessionStatus};
use crate::llm::{LlmProvider, ModelRouter};
use crate::session::{Message, MessageRole, Session, SessionStorage, SessionStore};
use crate::skills::{SkillProfile, SkillResolver};
use crate::tools::ToolRegistry;

use super::broadcaster::{EventBroadcaster, Subscription};

/// Engine entry point shared by every control surface
pub struct SessionOrchestrator {
    config: EngineConfig,
    services: LoopServices,
    router: ModelRouter,
    skills: Arc<dyn SkillResolver>,
    /// Serializes the active count with the create write
    admission: Mutex<()>,
    /// In-flight run per session
    runs: Mutex<HashMap<Uuid, JoinHandle<()>>>,
    cleanup: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl SessionOrchestrator {
    /// Create an orchestrator, reopening the session store from disk
    pub fn new(
        config: EngineConfig,
        tools: ToolRegistry,
        router: ModelRouter,
        skills: Arc<dyn SkillResolver>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let store = SessionStore::open(SessionStorage::with_dir(&config.storage_dir))?;
        let tools = tools.with_default_timeout(config.tool_timeout());

        let services = LoopServices {
            store: Arc::new(store),
            broadcaster: Arc::new(EventBroadcaster::with_send_timeout(
                config.observer_send_timeout(),
            )),
            tools: Arc::new(tools),
            interpreter: Arc::new(StepInterpreter::new()?),
        };

        tracing::info!(
            max_concurrent_sessions = config.max_concurrent_sessions,
            max_steps = config.max_steps,
            resume_strategy = ?config.resume_strategy,
            tools = services.tools.len(),
            "Session orchestrator ready"
        );

        Ok(Self {
            config,
            services,
            router,
            skills,
            admission: Mutex::new(()),
            runs: Mutex::new(HashMap::new()),
            cleanup: Mutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared session store
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.services.store
    }

    /// The shared event broadcaster
    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.services.broadcaster
    }

    /// Start the periodic expiry sweep (idempotent)
    pub async fn start_cleanup(&self) {
        let mut cleanup = self.cleanup.lock().await;
        if cleanup.is_some() {
            return;
        }

        let store = self.services.store.clone();
        let broadcaster = self.services.broadcaster.clone();
        let interval = self.config.cleanup_interval();
        let timeout = self.config.session_timeout();
        let cancel = self.cancel.child_token();

        *cleanup = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Session cleanup task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let expired = sweep(&store, &broadcaster, timeout).await;
                        if !expired.is_empty() {
                            tracing::info!(count = expired.len(), "Expired sessions removed");
                        }
                    }
                }
            }
        }));
    }

    /// Remove sessions idle for longer than `timeout`, with their observers
    pub async fn sweep_expired(&self, timeout: Duration) -> Vec<Uuid> {
        sweep(&self.services.store, &self.services.broadcaster, timeout).await
    }

    /// Start a new session and schedule its first run
    ///
    /// Returns as soon as the session is persisted; the run proceeds in the
    /// background. Fails with `CapacityExceeded` when the number of RUNNING
    /// and PAUSED sessions is already at the cap.
    pub async fn start_session(
        &self,
        skill_id: &str,
        input: &str,
        mode: ExecutionMode,
        session_config: SessionConfig,
    ) -> EngineResult<Session> {
        session_config.validate()?;
        let profile = self.skills.resolve(skill_id).await?;
        let llm = self
            .router
            .resolve(profile.tier, session_config.model_id.as_deref())?;

        let session = {
            let _admission = self.admission.lock().await;

            let active = self.services.store.count_active().await;
            if active >= self.config.max_concurrent_sessions {
                tracing::warn!(active, limit = self.config.max_concurrent_sessions, "Admission refused");
                return Err(EngineError::CapacityExceeded {
                    limit: self.config.max_concurrent_sessions,
                });
            }

            let mut session = Session::new(skill_id, mode, session_config);
            session.push_message(MessageRole::Human, input);
            self.services.store.create(session).await?
        };

        tracing::info!(
            session_id = %session.session_id,
            skill_id,
            mode = %mode,
            tier = %profile.tier,
            "Session started"
        );

        self.spawn_run(&session, llm, &profile).await;
        Ok(session)
    }

    /// Resume a paused session with the user's reply
    ///
    /// The PAUSED check, the reply and the switch to RUNNING happen in one
    /// store update, so two concurrent resumes cannot both succeed.
    pub async fn resume_session(&self, session_id: &Uuid, user_input: &str) -> EngineResult<Session> {
        let current = self.services.store.get(session_id).await?;
        if current.status != SessionStatus::Paused {
            return Err(EngineError::InvalidState {
                id: session_id.to_string(),
                status: current.status,
            });
        }

        let profile = self.skills.resolve(&current.skill_id).await?;
        let llm = self
            .router
            .resolve(profile.tier, current.config.model_id.as_deref())?;

        let reply = Message::human(*session_id, user_input);
        let session = self
            .services
            .store
            .try_update(session_id, |session| {
                if session.status != SessionStatus::Paused {
                    return Err(EngineError::InvalidState {
                        id: session.id(),
                        status: session.status,
                    });
                }
                session.push(reply);
                session.status = SessionStatus::Running;
                Ok(session.clone())
            })
            .await?;

        tracing::info!(session_id = %session_id, "Session resumed");

        self.spawn_run(&session, llm, &profile).await;
        Ok(session)
    }

    /// Read-only snapshot of a session
    pub async fn get_session(&self, session_id: &Uuid) -> EngineResult<Session> {
        self.services.store.get(session_id).await
    }

    /// Sessions that are RUNNING or PAUSED
    pub async fn list_active(&self) -> Vec<Session> {
        self.services.store.list_active().await
    }

    /// Subscribe to a session's progress events
    pub async fn subscribe(&self, session_id: &Uuid) -> EngineResult<Subscription> {
        if !self.services.store.contains(session_id).await {
            return Err(EngineError::NotFound(session_id.to_string()));
        }
        Ok(self.services.broadcaster.subscribe(*session_id).await)
    }

    /// Delete a session, aborting its run if one is in flight
    pub async fn delete_session(&self, session_id: &Uuid) -> EngineResult<()> {
        if let Some(handle) = self.runs.lock().await.remove(session_id) {
            handle.abort();
        }

        let deleted = self.services.store.delete(session_id).await?;
        self.services.broadcaster.remove_session(session_id).await;

        if !deleted {
            return Err(EngineError::NotFound(session_id.to_string()));
        }
        tracing::info!(session_id = %session_id, "Session deleted");
        Ok(())
    }

    /// Abort every run and delete every session
    pub async fn clear_sessions(&self) -> EngineResult<usize> {
        self.abort_runs().await;
        let deleted = self.services.store.clear().await?;
        self.services.broadcaster.clear().await;
        tracing::info!(count = deleted, "All sessions cleared");
        Ok(deleted)
    }

    /// Check if a session has a run in flight
    pub async fn is_running(&self, session_id: &Uuid) -> bool {
        self.runs
            .lock()
            .await
            .get(session_id)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Wait for a session's current run to complete
    pub async fn wait_for_run(&self, session_id: &Uuid) {
        loop {
            if !self.is_running(session_id).await {
                return;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }
    }

    /// Stop the cleanup task and abort every in-flight run
    ///
    /// Sessions left RUNNING are marked FAILED the next time the store is
    /// opened.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.cleanup.lock().await.take() {
            let _ = handle.await;
        }
        let aborted = self.abort_runs().await;
        tracing::info!(aborted, "Session orchestrator shut down");
    }

    async fn abort_runs(&self) -> usize {
        let handles: Vec<JoinHandle<()>> = self.runs.lock().await.drain().map(|(_, h)| h).collect();
        let mut aborted = 0;
        for handle in handles {
            if !handle.is_finished() {
                aborted += 1;
            }
            handle.abort();
            let _ = handle.await;
        }
        aborted
    }

    /// Schedule a run for a session that is RUNNING
    ///
    /// A new run waits for the session's previous run task to exit before
    /// its first step, so two runs never overlap for one session.
    async fn spawn_run(&self, session: &Session, llm: Arc<dyn LlmProvider>, profile: &SkillProfile) {
        let session_id = session.session_id;
        let max_steps = session.config.effective_max_steps(self.config.max_steps);
        let agent_config = AgentConfig::new(session.mode)
            .with_max_steps(max_steps)
            .with_template(profile.prompt_template.as_deref());

        let agent = AgentLoop::new(session_id, self.services.clone(), llm, agent_config);
        let input = RunInput::for_session(session, self.config.resume_strategy);
        let broadcaster = self.services.broadcaster.clone();
        let store = self.services.store.clone();

        let mut runs = self.runs.lock().await;
        runs.retain(|_, handle| !handle.is_finished());
        let previous = runs.remove(&session_id);

        let task = async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }

            match agent.run(input).await {
                Ok(outcome) => {
                    tracing::debug!(outcome = ?outcome, "Run task completed");
                }
                Err(e) => {
                    // The failure could not be written back
                    tracing::error!(error = %e, "Run task errored");
                    let note = Message::system(session_id, e.to_string());
                    if let Err(e) = store
                        .force_status(&session_id, SessionStatus::Failed, Some(note))
                        .await
                    {
                        tracing::warn!(error = %e, "Could not mark session failed");
                    }
                    broadcaster
                        .publish(&session_id, ProgressEvent::error(e.to_string()))
                        .await;
                }
            }
        };

        let handle = tokio::spawn(task.instrument(tracing::info_span!(
            "session_run",
            session_id = %session_id
        )));
        runs.insert(session_id, handle);
    }
}

async fn sweep(store: &SessionStore, broadcaster: &EventBroadcaster, timeout: Duration) -> Vec<Uuid> {
    let expired = store.sweep_expired(timeout).await;
    for id in &expired {
        broadcaster.remove_session(id).await;
    }
    expired
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("config", &self.config)
            .field("router", &self.router)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ambiguity_message, MAX_STEPS_MESSAGE};
    use crate::config::ResumeStrategy;
    use crate::skills::StaticSkillResolver;
    use crate::test_support::{FnLlm, GatedLlm, StaticTool};
    use crate::tools::RequestHumanInputTool;
    use std::time::Duration;
    use tempfile::TempDir;

    const QUESTION: &str = "Which color do you prefer?";

    fn engine_with(
        llm: Arc<dyn LlmProvider>,
        config: impl FnOnce(EngineConfig) -> EngineConfig,
    ) -> (SessionOrchestrator, TempDir) {
        let temp = TempDir::new().unwrap();
        let config = config(EngineConfig::new().with_storage_dir(temp.path().join("sessions")));

        let mut tools = ToolRegistry::new();
        tools.register(RequestHumanInputTool::new());
        tools.register(StaticTool::new("inventory", "red, blue"));

        let orchestrator = SessionOrchestrator::new(
            config,
            tools,
            ModelRouter::single(llm),
            Arc::new(StaticSkillResolver::new()),
        )
        .unwrap();
        (orchestrator, temp)
    }

    fn engine(llm: Arc<dyn LlmProvider>) -> (SessionOrchestrator, TempDir) {
        engine_with(llm, |config| config)
    }

    /// Collect events up to and including the next terminal one
    async fn next_terminal(sub: &mut Subscription) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), sub.recv())
                .await
                .expect("timed out waiting for events")
                .expect("subscription closed");
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                return events;
            }
        }
    }

    async fn start(orchestrator: &SessionOrchestrator, mode: ExecutionMode) -> EngineResult<Session> {
        orchestrator
            .start_session("paint", "Paint the fence", mode, SessionConfig::new())
            .await
    }

    #[tokio::test]
    async fn test_sixth_session_admitted_after_one_finishes() {
        let (orchestrator, _temp) = engine(Arc::new(FnLlm::asks_then_echoes(QUESTION)));

        let mut ids = Vec::new();
        for _ in 0..5 {
            let session = start(&orchestrator, ExecutionMode::Interactive).await.unwrap();
            orchestrator.wait_for_run(&session.session_id).await;
            ids.push(session.session_id);
        }
        assert_eq!(orchestrator.list_active().await.len(), 5);

        let refused = start(&orchestrator, ExecutionMode::Interactive).await;
        match refused {
            Err(e @ EngineError::CapacityExceeded { limit: 5 }) => assert_eq!(e.http_status(), 429),
            other => panic!("expected CapacityExceeded, got {:?}", other),
        }

        orchestrator.resume_session(&ids[0], "Blue").await.unwrap();
        orchestrator.wait_for_run(&ids[0]).await;
        let finished = orchestrator.get_session(&ids[0]).await.unwrap();
        assert_eq!(finished.status, SessionStatus::Finished);

        assert!(start(&orchestrator, ExecutionMode::Interactive).await.is_ok());
        orchestrator.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_never_exceed_cap() {
        let inner: Arc<dyn LlmProvider> = Arc::new(FnLlm::constant("Final Answer: done"));
        // Gate never opens: every admitted session stays RUNNING
        let (gated, _gate) = GatedLlm::new(inner);
        let (orchestrator, _temp) = engine(Arc::new(gated));
        let orchestrator = Arc::new(orchestrator);

        let attempts: Vec<_> = (0..12)
            .map(|_| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { start(&orchestrator, ExecutionMode::Autonomous).await })
            })
            .collect();

        let mut admitted = 0;
        let mut refused = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(EngineError::CapacityExceeded { .. }) => refused += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
            assert!(orchestrator.list_active().await.len() <= 5);
        }

        assert_eq!(admitted, 5);
        assert_eq!(refused, 7);
        assert_eq!(orchestrator.store().count_active().await, 5);
        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_resume_errors() {
        let (orchestrator, _temp) = engine(Arc::new(FnLlm::constant("Final Answer: done")));

        let unknown = orchestrator.resume_session(&Uuid::new_v4(), "Blue").await;
        assert!(matches!(unknown, Err(EngineError::NotFound(_))));

        let session = start(&orchestrator, ExecutionMode::Interactive).await.unwrap();
        orchestrator.wait_for_run(&session.session_id).await;

        let result = orchestrator.resume_session(&session.session_id, "Blue").await;
        match result {
            Err(e @ EngineError::InvalidState { status: SessionStatus::Finished, .. }) => {
                assert_eq!(e.http_status(), 400)
            }
            other => panic!("expected InvalidState, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resume_while_running_is_rejected() {
        let inner: Arc<dyn LlmProvider> = Arc::new(FnLlm::asks_then_echoes(QUESTION));
        let (gated, _gate) = GatedLlm::new(inner);
        let (orchestrator, _temp) = engine(Arc::new(gated));

        let session = start(&orchestrator, ExecutionMode::Interactive).await.unwrap();
        let result = orchestrator.resume_session(&session.session_id, "Blue").await;
        assert!(matches!(
            result,
            Err(EngineError::InvalidState { status: SessionStatus::Running, .. })
        ));
        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_autonomous_interrupt_fails_with_ambiguity() {
        let inner: Arc<dyn LlmProvider> = Arc::new(FnLlm::asks_then_echoes(QUESTION));
        let (gated, gate) = GatedLlm::new(inner);
        let (orchestrator, _temp) = engine(Arc::new(gated));

        let session = start(&orchestrator, ExecutionMode::Autonomous).await.unwrap();
        let mut sub = orchestrator.subscribe(&session.session_id).await.unwrap();
        gate.add_permits(1);

        let events = next_terminal(&mut sub).await;
        assert!(!events
            .iter()
            .any(|e| matches!(e, ProgressEvent::InputRequested { .. })));
        match events.last() {
            Some(ProgressEvent::Error { message }) => {
                assert!(message.contains("Ambiguity"));
                assert_eq!(message, &ambiguity_message(QUESTION));
            }
            other => panic!("expected error event, got {:?}", other),
        }

        orchestrator.wait_for_run(&session.session_id).await;
        let stored = orchestrator.get_session(&session.session_id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::Failed);
    }

    #[tokio::test]
    async fn test_interactive_pause_and_resume() {
        let inner: Arc<dyn LlmProvider> = Arc::new(FnLlm::asks_then_echoes(QUESTION));
        let (gated, gate) = GatedLlm::new(inner);
        let (orchestrator, _temp) = engine(Arc::new(gated));

        let session = start(&orchestrator, ExecutionMode::Interactive).await.unwrap();
        let id = session.session_id;
        let mut sub = orchestrator.subscribe(&id).await.unwrap();
        gate.add_permits(1);

        let events = next_terminal(&mut sub).await;
        let requests: Vec<&ProgressEvent> = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::InputRequested { .. }))
            .collect();
        assert_eq!(requests, vec![&ProgressEvent::input_requested(QUESTION)]);
        assert!(events.contains(&ProgressEvent::tool_call("request_human_input")));

        orchestrator.wait_for_run(&id).await;
        assert_eq!(
            orchestrator.get_session(&id).await.unwrap().status,
            SessionStatus::Paused
        );

        orchestrator.resume_session(&id, "Blue").await.unwrap();
        let events = next_terminal(&mut sub).await;
        match events.last() {
            Some(ProgressEvent::FinalAnswer { content }) => assert!(content.contains("Blue")),
            other => panic!("expected final answer, got {:?}", other),
        }

        orchestrator.wait_for_run(&id).await;
        let stored = orchestrator.get_session(&id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::Finished);
        assert_eq!(
            stored.clarifications(),
            vec![(QUESTION.to_string(), "Blue".to_string())]
        );
    }

    #[tokio::test]
    async fn test_restore_scratchpad_strategy() {
        let llm = FnLlm::new(|prompt| {
            if prompt.contains("Observation: Blue") {
                Ok("Final Answer: Painting it Blue".to_string())
            } else {
                Ok(format!("Action: request_human_input\nAction Input: {}", QUESTION))
            }
        });
        let (orchestrator, _temp) = engine_with(Arc::new(llm), |config| {
            config.with_resume_strategy(ResumeStrategy::RestoreScratchpad)
        });

        let session = start(&orchestrator, ExecutionMode::Interactive).await.unwrap();
        orchestrator.wait_for_run(&session.session_id).await;
        orchestrator.resume_session(&session.session_id, "Blue").await.unwrap();
        orchestrator.wait_for_run(&session.session_id).await;

        let stored = orchestrator.get_session(&session.session_id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::Finished);
        assert_eq!(stored.last_message().unwrap().content, "Painting it Blue");
    }

    #[tokio::test]
    async fn test_session_step_budget() {
        let (orchestrator, _temp) = engine(Arc::new(FnLlm::constant("Action: inventory\nAction Input: x")));

        let session = orchestrator
            .start_session(
                "paint",
                "Count paint",
                ExecutionMode::Autonomous,
                SessionConfig::new().with_max_steps(2),
            )
            .await
            .unwrap();
        orchestrator.wait_for_run(&session.session_id).await;

        let stored = orchestrator.get_session(&session.session_id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::Failed);
        assert_eq!(stored.last_message().unwrap().content, MAX_STEPS_MESSAGE);
    }

    #[tokio::test]
    async fn test_unknown_model_is_rejected_before_admission() {
        let (orchestrator, _temp) = engine(Arc::new(FnLlm::constant("Final Answer: x")));

        let result = orchestrator
            .start_session(
                "paint",
                "task",
                ExecutionMode::Interactive,
                SessionConfig::new().with_model_id("missing-model"),
            )
            .await;
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
        assert!(orchestrator.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (orchestrator, _temp) = engine(Arc::new(FnLlm::asks_then_echoes(QUESTION)));

        let a = start(&orchestrator, ExecutionMode::Interactive).await.unwrap();
        let b = start(&orchestrator, ExecutionMode::Interactive).await.unwrap();
        orchestrator.wait_for_run(&a.session_id).await;
        orchestrator.wait_for_run(&b.session_id).await;

        orchestrator.delete_session(&a.session_id).await.unwrap();
        assert!(matches!(
            orchestrator.get_session(&a.session_id).await,
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            orchestrator.delete_session(&a.session_id).await,
            Err(EngineError::NotFound(_))
        ));

        assert_eq!(orchestrator.clear_sessions().await.unwrap(), 1);
        assert!(orchestrator.list_active().await.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_marks_interrupted_runs_failed() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::new().with_storage_dir(temp.path().join("sessions"));
        let inner: Arc<dyn LlmProvider> = Arc::new(FnLlm::constant("Final Answer: x"));
        let (gated, _gate) = GatedLlm::new(inner.clone());

        let first = SessionOrchestrator::new(
            config.clone(),
            ToolRegistry::new(),
            ModelRouter::single(Arc::new(gated)),
            Arc::new(StaticSkillResolver::new()),
        )
        .unwrap();
        let session = start(&first, ExecutionMode::Interactive).await.unwrap();
        first.shutdown().await;

        let second = SessionOrchestrator::new(
            config,
            ToolRegistry::new(),
            ModelRouter::single(inner),
            Arc::new(StaticSkillResolver::new()),
        )
        .unwrap();
        let stored = second.get_session(&session.session_id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::Failed);
        assert!(second.list_active().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_ends_run_failed() {
        let inner: Arc<dyn LlmProvider> = Arc::new(FnLlm::constant("Final Answer: done"));
        let (gated, gate) = GatedLlm::new(inner);
        let (orchestrator, temp) =
            engine_with(Arc::new(gated), |config| config.with_max_concurrent_sessions(1));
        let dir = temp.path().join("sessions");

        let session = start(&orchestrator, ExecutionMode::Autonomous).await.unwrap();
        let id = session.session_id;
        let mut sub = orchestrator.subscribe(&id).await.unwrap();

        // Every write from here on fails
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, b"not a directory").unwrap();
        gate.add_permits(1);

        let events = next_terminal(&mut sub).await;
        match events.last() {
            Some(ProgressEvent::Error { message }) => assert!(message.starts_with("IO error")),
            other => panic!("expected error event, got {:?}", other),
        }

        orchestrator.wait_for_run(&id).await;
        assert_eq!(
            orchestrator.get_session(&id).await.unwrap().status,
            SessionStatus::Failed
        );
        assert!(orchestrator.list_active().await.is_empty());

        // The slot is free again once storage recovers
        std::fs::remove_file(&dir).unwrap();
        assert!(start(&orchestrator, ExecutionMode::Autonomous).await.is_ok());
        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweep_drops_observers_of_removed_sessions() {
        let (orchestrator, _temp) = engine(Arc::new(FnLlm::constant("Final Answer: done")));

        let session = start(&orchestrator, ExecutionMode::Autonomous).await.unwrap();
        let id = session.session_id;
        let sub = orchestrator.subscribe(&id).await.unwrap();
        orchestrator.wait_for_run(&id).await;
        drop(sub);
        assert_eq!(orchestrator.broadcaster().observer_count(&id).await, 1);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(orchestrator.sweep_expired(Duration::ZERO).await, vec![id]);
        assert!(!orchestrator.store().contains(&id).await);
        assert_eq!(orchestrator.broadcaster().observer_count(&id).await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_shutdown() {
        let (orchestrator, _temp) = engine(Arc::new(FnLlm::constant("Final Answer: done")));
        orchestrator.start_cleanup().await;
        orchestrator.start_cleanup().await;

        tokio::time::timeout(Duration::from_secs(1), orchestrator.shutdown())
            .await
            .unwrap();
    }
}
