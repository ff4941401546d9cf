// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `Supervisor`: bounds how many sessions may be `doing` at once with a
//! fixed-size worker pool and a FIFO queue for the rest.

use crate::runner::{SessionRunner, StepOutcome};
use crate::model::ModelClient;
use crate::{EngineError, EngineResult, DEFAULT_CONCURRENCY};
use foreman_core::{validate_transition, Clock, SessionId, SessionStatus};
use foreman_locks::LockArbiter;
use foreman_storage::Store;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct Supervisor<C: Clock = foreman_core::SystemClock> {
    store: Arc<Store<C>>,
    runner: Arc<SessionRunner<C>>,
    slots: Arc<Semaphore>,
}

impl<C: Clock> Supervisor<C> {
    pub fn new(store: Arc<Store<C>>, runner: Arc<SessionRunner<C>>) -> Self {
        Self { store, runner, slots: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)) }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.slots = Arc::new(Semaphore::new(n));
        self
    }

    /// Number of worker slots currently free.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Acquire a worker slot, run one turn of `session_id`, apply whatever
    /// status transition its outcome implies, and release every lock the
    /// session still holds as a backstop regardless of how the turn ended.
    pub async fn drive(
        &self,
        session_id: SessionId,
        project_path: String,
        model: Arc<dyn ModelClient>,
        locks: Arc<LockArbiter<C>>,
    ) -> EngineResult<StepOutcome> {
        let permit = self.slots.clone().acquire_owned().await.map_err(|_| EngineError::PoolClosed)?;
        let outcome = self.runner.run(session_id, &project_path, model.as_ref()).await;
        let _ = locks.release_all_for_session(&session_id);
        drop(permit);
        let outcome = outcome?;
        self.apply_transition(session_id, &outcome)?;
        Ok(outcome)
    }

    fn apply_transition(&self, session_id: SessionId, outcome: &StepOutcome) -> EngineResult<()> {
        let Some(session) = self.store.get_session(&session_id) else { return Ok(()) };
        match outcome {
            StepOutcome::Review { summary, changes, notes } => {
                validate_transition(session.status, SessionStatus::Review)?;
                let metadata = serde_json::json!({"summary": summary, "changes": changes, "notes": notes});
                self.store.update_session_status(&session_id, SessionStatus::Review, metadata)?;
            }
            StepOutcome::NeedClarification { metadata, .. } => {
                validate_transition(session.status, SessionStatus::NeedClarification)?;
                self.store.update_session_status(&session_id, SessionStatus::NeedClarification, metadata.clone())?;
            }
            StepOutcome::Continue => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
