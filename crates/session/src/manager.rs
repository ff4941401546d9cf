// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `SessionManager`: the Session Manager facade. Every public command is a
//! method here, each one either a thin wrapper over `foreman_storage::Store`
//! (validated against `foreman_core::validate_transition`) or a driver of
//! one session's `foreman_engine::Supervisor` execution to completion.
//!
//! Singletons: one `SessionManager` per process, holding the one `Store`,
//! `LockArbiter`, `Journal`, `Supervisor`, and `EventBus` instance, passed
//! by `Arc` rather than reached for through a global.

use crate::bus::EventBus;
use crate::error::{SessionError, SessionResult};
use foreman_core::{
    validate_transition, Clock, Event, Message, MessageRole, ProgressEntry, ProgressStatus,
    Session, SessionId, SessionStatus, SystemClock,
};
use foreman_engine::{ModelClient, StepOutcome, Supervisor, DEFAULT_CONCURRENCY, DEFAULT_MAX_STEPS};
use foreman_journal::Journal;
use foreman_locks::LockArbiter;
use foreman_storage::{ProjectSummary, Store};
use foreman_tools::ToolSurface;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Arguments to `createAgent`.
#[derive(Debug, Clone, Default)]
pub struct CreateAgentRequest {
    pub name: String,
    pub description: Option<String>,
    pub project_path: String,
    pub project_name: Option<String>,
    pub workspace_root: Option<String>,
    pub initial_prompt: Option<String>,
}

/// Options accepted by `startAgent`. `auto_retry`/`retry_attempts` are
/// reserved: stored on the session's metadata but never read by the
/// execution loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartAgentOptions {
    pub max_steps: Option<u64>,
    pub auto_retry: Option<bool>,
    pub retry_attempts: Option<u32>,
}

/// Derived progress counters attached to a `listAgents` row.
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub current_step: Option<String>,
    pub total_steps: usize,
    pub completed_steps: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSummary {
    pub session: Session,
    pub progress: ProgressSummary,
}

/// `total`/`by_status`/`running`/`recent_activity` per `getProjectAgentSummary`.
#[derive(Debug, Clone)]
pub struct ProjectAgentSummary {
    pub total: usize,
    pub by_status: HashMap<String, usize>,
    pub running: usize,
    pub recent_activity: Vec<Session>,
}

/// Result of `checkFileConflicts`.
#[derive(Debug, Clone)]
pub struct FileConflictReport {
    pub conflicts: Vec<String>,
    pub can_proceed: bool,
    pub suggestions: Option<Vec<String>>,
}

pub struct SessionManager<C: Clock = SystemClock> {
    store: Arc<Store<C>>,
    locks: Arc<LockArbiter<C>>,
    journal: Arc<Journal<C>>,
    supervisor: Arc<Supervisor<C>>,
    model: Arc<dyn ModelClient>,
    bus: Arc<EventBus>,
    running: Mutex<HashMap<SessionId, CancellationToken>>,
    clock: C,
}

impl SessionManager<SystemClock> {
    pub fn new(store: Arc<Store<SystemClock>>, model: Arc<dyn ModelClient>) -> Self {
        Self::new_with_clock(store, model, SystemClock)
    }
}

impl<C: Clock + 'static> SessionManager<C> {
    pub fn new_with_clock(store: Arc<Store<C>>, model: Arc<dyn ModelClient>, clock: C) -> Self {
        Self::new_with_options(store, model, clock, DEFAULT_CONCURRENCY, DEFAULT_MAX_STEPS)
    }

    pub fn new_with_options(
        store: Arc<Store<C>>,
        model: Arc<dyn ModelClient>,
        clock: C,
        concurrency: usize,
        max_steps: u64,
    ) -> Self {
        let bus = Arc::new(EventBus::new());

        let lock_bus = bus.clone();
        let locks = Arc::new(
            LockArbiter::new(store.clone(), clock.clone())
                .with_publisher(Arc::new(move |e: &Event| lock_bus.publish(e))),
        );
        let journal = Arc::new(Journal::new(store.clone()));
        let tools = Arc::new(ToolSurface::new(store.clone(), locks.clone(), journal.clone()));

        let runner_bus = bus.clone();
        let runner = Arc::new(
            foreman_engine::SessionRunner::new(store.clone(), tools)
                .with_max_steps(max_steps)
                .with_publisher(Arc::new(move |e: &Event| runner_bus.publish(e))),
        );
        let supervisor = Arc::new(Supervisor::new(store.clone(), runner).with_concurrency(concurrency));

        Self { store, locks, journal, supervisor, model, bus, running: Mutex::new(HashMap::new()), clock }
    }

    /// The event bus backing this manager, for subscribers to attach to.
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Annotate any session left `doing` by an unclean shutdown. Intended
    /// to be called once, right after construction, before the manager is
    /// handed to a transport or CLI.
    pub fn reconcile_on_startup(&self) -> SessionResult<usize> {
        Ok(foreman_engine::reconcile_doing_sessions(&self.store)?)
    }

    /// Cancel every in-flight execution, wait briefly for their tasks to
    /// observe cancellation and release their locks, then force a final
    /// synchronous checkpoint. Intended to be called once from a process's
    /// shutdown path.
    pub async fn shutdown(&self) -> SessionResult<()> {
        let tokens: Vec<CancellationToken> = self.running.lock().values().cloned().collect();
        for token in &tokens {
            token.cancel();
        }
        for _ in 0..100 {
            if self.running.lock().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        self.store.flush()?;
        Ok(())
    }

    fn get_session_or_not_found(&self, id: &SessionId) -> SessionResult<Session> {
        self.store.get_session(id).ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    fn transition(&self, id: &SessionId, to: SessionStatus, metadata: Value) -> SessionResult<()> {
        let session = self.get_session_or_not_found(id)?;
        validate_transition(session.status, to)?;
        self.store.update_session_status(id, to, metadata.clone())?;
        self.bus.publish(&Event::SessionStatusChanged {
            session_id: *id,
            from: session.status,
            to,
            at_ms: self.clock.epoch_ms(),
            metadata,
        });
        Ok(())
    }

    // ---- createAgent / listAgents / getAgent / deleteAgent ----

    pub fn create_agent(&self, req: CreateAgentRequest) -> SessionResult<Session> {
        let project_path = canonicalize_project_path(&req.project_path)?;
        let session = self.store.create_session(
            req.name,
            req.description,
            project_path,
            req.project_name,
            req.workspace_root,
        )?;
        self.bus.publish(&Event::SessionCreated { session: session.clone() });
        if let Some(prompt) = req.initial_prompt {
            self.add_message(session.id, MessageRole::User, prompt)?;
        }
        Ok(self.get_session_or_not_found(&session.id)?)
    }

    pub fn list_agents(
        &self,
        project_path: Option<&str>,
        status: Option<SessionStatus>,
    ) -> Vec<SessionSummary> {
        self.store.list_sessions(project_path, status).into_iter().map(|s| self.summarize(s)).collect()
    }

    fn summarize(&self, session: Session) -> SessionSummary {
        let progress = self.store.get_progress(&session.id);
        let completed_steps =
            progress.iter().filter(|p| p.status == ProgressStatus::Completed).count();
        let current_step = progress.last().map(|p: &ProgressEntry| p.step.clone());
        let total_steps = progress.len();
        SessionSummary { session, progress: ProgressSummary { current_step, total_steps, completed_steps } }
    }

    pub fn get_agent(&self, id: &SessionId) -> Option<Session> {
        self.store.get_session(id)
    }

    /// Stops execution if running, releases any held locks, deletes the
    /// session and cascades to its child records, then fans out
    /// `agentDeleted`.
    pub fn delete_agent(&self, id: SessionId) -> SessionResult<()> {
        self.stop_agent(id, Some("deleted".to_string()))?;
        self.locks.release_all_for_session(&id)?;
        self.store.delete_session(&id)?;
        self.running.lock().remove(&id);
        self.bus.publish(&Event::SessionDeleted { session_id: id });
        Ok(())
    }

    // ---- startAgent / stopAgent / isAgentRunning / getRunningAgents ----

    pub fn is_agent_running(&self, id: &SessionId) -> bool {
        self.running.lock().contains_key(id)
    }

    pub fn get_running_agents(&self) -> Vec<SessionId> {
        self.running.lock().keys().copied().collect()
    }

    /// `stopAgent`: trips the cancellation token of a running execution
    /// context. No-op if the agent is not currently running.
    pub fn stop_agent(&self, id: SessionId, _reason: Option<String>) -> SessionResult<()> {
        if let Some(token) = self.running.lock().get(&id) {
            token.cancel();
        }
        Ok(())
    }

    /// `startAgent`: validates `todo|need_clarification -> doing`, records
    /// the (inert, reserved) start options on the session's metadata, and
    /// spawns a background task that drives the session's model-turn loop
    /// to a terminal outcome via `foreman_engine::Supervisor`.
    pub async fn start_agent(
        self: &Arc<Self>,
        id: SessionId,
        options: Option<StartAgentOptions>,
    ) -> SessionResult<bool> {
        if self.is_agent_running(&id) {
            return Err(SessionError::AlreadyRunning(id));
        }
        let session = self.get_session_or_not_found(&id)?;
        validate_transition(session.status, SessionStatus::Doing)?;

        let options = options.unwrap_or_default();
        let metadata = json!({
            "startOptions": {
                "maxSteps": options.max_steps,
                "autoRetry": options.auto_retry,
                "retryAttempts": options.retry_attempts,
            }
        });
        self.transition(&id, SessionStatus::Doing, metadata)?;

        let token = CancellationToken::new();
        self.running.lock().insert(id, token.clone());

        let this = Arc::clone(self);
        let project_path = session.project_path;
        let model = self.model.clone();
        tokio::spawn(async move {
            this.run_to_completion(id, project_path, model, token).await;
        });
        Ok(true)
    }

    async fn run_to_completion(
        &self,
        id: SessionId,
        project_path: String,
        model: Arc<dyn ModelClient>,
        token: CancellationToken,
    ) {
        loop {
            let Some(before) = self.store.get_session(&id) else { break };
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    self.handle_abort(id, "cancelled via stopAgent".to_string());
                    break;
                }
                result = self.supervisor.drive(id, project_path.clone(), model.clone(), self.locks.clone()) => {
                    match result {
                        Ok(StepOutcome::Continue) => continue,
                        Ok(_) => {
                            self.publish_status_delta(id, before.status);
                            self.bus.publish(&Event::ExecutionComplete { session_id: id });
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(session_id = %id, error = %e, "execution failed");
                            let reason = e.to_string();
                            if before.status == SessionStatus::Doing {
                                let _ = self.store.update_session_status(
                                    &id,
                                    SessionStatus::NeedClarification,
                                    json!({"error": reason}),
                                );
                            }
                            self.publish_status_delta(id, before.status);
                            self.bus.publish(&Event::ExecutionAborted { session_id: id, reason });
                            break;
                        }
                    }
                }
            }
        }
        self.running.lock().remove(&id);
    }

    /// Publishes `statusChanged` if the session's status actually moved
    /// since `before`. The transition itself was already applied by
    /// `Supervisor::drive` (engine-driven) or by this function's caller
    /// (abort path) — this only reconstructs the bus notification, since
    /// neither `Supervisor` nor `Store` holds a reference to the bus.
    fn publish_status_delta(&self, id: SessionId, before: SessionStatus) {
        if let Some(after) = self.store.get_session(&id) {
            if after.status != before {
                self.bus.publish(&Event::SessionStatusChanged {
                    session_id: id,
                    from: before,
                    to: after.status,
                    at_ms: after.updated_at_ms,
                    metadata: after.metadata,
                });
            }
        }
    }

    fn handle_abort(&self, id: SessionId, reason: String) {
        let _ = self.locks.release_all_for_session(&id);
        let Some(session) = self.store.get_session(&id) else { return };
        if session.status == SessionStatus::Doing {
            let metadata = json!({"reason": reason});
            if self.store.update_session_status(&id, SessionStatus::NeedClarification, metadata).is_ok() {
                self.publish_status_delta(id, SessionStatus::Doing);
            }
        }
        self.bus.publish(&Event::ExecutionAborted { session_id: id, reason });
    }

    // ---- updateAgentStatus ----

    /// `updateAgentStatus`: validated against `foreman_core::validate_transition`.
    /// `review -> accepted` triggers `Journal::accept_all`; `review ->
    /// rejected` triggers `Journal::revert_all`.
    pub fn update_agent_status(&self, id: SessionId, status: SessionStatus) -> SessionResult<()> {
        self.transition(&id, status, Value::Null)?;
        match status {
            SessionStatus::Accepted => self.journal.accept_all(&id)?,
            SessionStatus::Rejected => self.journal.revert_all(&id)?,
            _ => {}
        }
        Ok(())
    }

    // ---- addMessage / getMessages / getProgress ----

    /// `addMessage`: only `user`/`system` roles are accepted over this
    /// surface (assistant/tool messages are engine-internal). A `user`
    /// message implicitly resumes `ideas -> todo` or `need_clarification ->
    /// todo`.
    pub fn add_message(&self, id: SessionId, role: MessageRole, content: String) -> SessionResult<Message> {
        if !matches!(role, MessageRole::User | MessageRole::System) {
            return Err(SessionError::InvalidRole);
        }
        let session = self.get_session_or_not_found(&id)?;
        let next_index = self.store.get_messages(&id, None).len() as u64;
        let message = self.store.add_message(id, role, content, None, next_index)?;
        self.bus.publish(&Event::MessageAdded { message: message.clone() });

        if role == MessageRole::User {
            let resume_to = match session.status {
                SessionStatus::Ideas | SessionStatus::NeedClarification => Some(SessionStatus::Todo),
                _ => None,
            };
            if let Some(to) = resume_to {
                self.transition(&id, to, Value::Null)?;
            }
        }
        Ok(message)
    }

    pub fn get_messages(&self, id: &SessionId, limit: Option<usize>) -> Vec<Message> {
        self.store.get_messages(id, limit)
    }

    pub fn get_progress(&self, id: &SessionId) -> Vec<ProgressEntry> {
        self.store.get_progress(id)
    }

    // ---- project views ----

    pub fn get_project_agent_summary(&self, project_path: &str) -> ProjectAgentSummary {
        let sessions = self.store.list_sessions(Some(project_path), None);
        let mut by_status: HashMap<String, usize> = HashMap::new();
        let mut running = 0usize;
        for session in &sessions {
            *by_status.entry(session.status.to_string()).or_insert(0) += 1;
            if session.is_running() {
                running += 1;
            }
        }
        let mut recent_activity = sessions.clone();
        recent_activity.sort_by(|a, b| b.updated_at_ms.cmp(&a.updated_at_ms));
        recent_activity.truncate(10);
        ProjectAgentSummary { total: sessions.len(), by_status, running, recent_activity }
    }

    pub fn get_all_projects(&self) -> Vec<ProjectSummary> {
        self.store.list_project_summaries()
    }

    /// `switchProject`: deliberately read-only. It returns the sessions
    /// currently `doing` under a *different* project than `path` —
    /// candidates a caller might choose to pause — and takes no action on
    /// any of them.
    pub fn switch_project(&self, path: &str) -> Vec<Session> {
        self.store
            .list_sessions(None, Some(SessionStatus::Doing))
            .into_iter()
            .filter(|s| s.project_path != path)
            .collect()
    }

    /// `cleanupInactiveProjects`: deletes every session whose project has
    /// had no activity within `days`, routed through `delete_agent` (not
    /// `Store::delete_inactive_projects` directly) so locks are released
    /// and `agentDeleted` is published for each.
    pub fn cleanup_inactive_projects(&self, days: u64) -> SessionResult<usize> {
        let cutoff_ms = self.clock.epoch_ms().saturating_sub(days.saturating_mul(24 * 60 * 60 * 1000));
        let stale_paths: std::collections::HashSet<String> = self
            .store
            .list_project_summaries()
            .into_iter()
            .filter(|p| p.last_activity_ms < cutoff_ms)
            .map(|p| p.project_path)
            .collect();
        let stale: Vec<SessionId> = self
            .store
            .list_sessions(None, None)
            .into_iter()
            .filter(|s| stale_paths.contains(&s.project_path))
            .map(|s| s.id)
            .collect();
        let count = stale.len();
        for id in stale {
            self.delete_agent(id)?;
        }
        Ok(count)
    }

    // ---- checkFileConflicts ----

    pub fn check_file_conflicts(&self, id: SessionId, paths: &[String]) -> FileConflictReport {
        let conflicts = self.locks.get_conflicts(id, paths);
        let can_proceed = conflicts.is_empty();
        let suggestions = if can_proceed {
            None
        } else {
            Some(
                conflicts
                    .iter()
                    .map(|p| format!("wait for the lock on {p} to clear, or ask the other agent to finish first"))
                    .collect(),
            )
        };
        FileConflictReport { conflicts, can_proceed, suggestions }
    }
}

fn canonicalize_project_path(path: &str) -> SessionResult<String> {
    std::fs::canonicalize(path)
        .map(|p| p.to_string_lossy().into_owned())
        .map_err(|e| SessionError::InvalidProject(format!("{path}: {e}")))
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
