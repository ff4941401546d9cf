// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `LockArbiter`: grants/denies read and write locks on canonical paths
//! across sessions.
//!
//! Acquisition is a single immediate decision — never blocks, never
//! queues. The loser of a race observes a `Conflict` and is responsible
//! (via `foreman-engine`) for transitioning its agent to
//! `need_clarification`.

use foreman_core::{Clock, Event, EventPublisher, Lock, LockId, LockKind, SessionId, lock_ttl_ms_for};
use foreman_storage::{LockAcquireOutcome, Store};
use std::sync::Arc;

use crate::{LockError, LockResult};

/// Outcome of a single acquisition attempt.
#[derive(Debug, Clone)]
pub enum LockOutcome {
    Granted(Lock),
    Conflict { path: String, conflicting_session: SessionId },
}

impl LockOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, LockOutcome::Granted(_))
    }
}

pub struct LockArbiter<C: Clock = foreman_core::SystemClock> {
    store: Arc<Store<C>>,
    clock: C,
    publisher: Option<EventPublisher>,
}

impl<C: Clock> LockArbiter<C> {
    pub fn new(store: Arc<Store<C>>, clock: C) -> Self {
        Self { store, clock, publisher: None }
    }

    /// Register the sink that `lockConflict` events are published through.
    /// Without one, conflicts are still returned in-band but nothing is
    /// fanned out on the bus.
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    fn publish(&self, event: Event) {
        if let Some(publisher) = &self.publisher {
            publisher(&event);
        }
    }

    /// Rule 1: a read lock is granted iff no live *write* lock on `path` is
    /// held by a different session.
    pub fn acquire_read_lock(&self, session_id: SessionId, path: &str) -> LockResult<LockOutcome> {
        self.try_acquire(session_id, path, LockKind::Read, |held| held == LockKind::Write)
    }

    /// Rule 2: a write lock is granted iff no live lock of any kind on
    /// `path` is held by a different session. Rule 3: same-session
    /// reacquisition always succeeds.
    pub fn acquire_write_lock(&self, session_id: SessionId, path: &str) -> LockResult<LockOutcome> {
        self.try_acquire(session_id, path, LockKind::Write, |_held| true)
    }

    /// Purge-expired, conflict-check (per `conflicts_with`), and insert as
    /// one call into `Store`, so the whole sequence runs under a single
    /// acquisition of the lock table's mutex (rule 4: "immediately before
    /// any acquisition attempt, rows with `expiresAt <= now` are purged").
    /// Two sessions racing for the same path can never both observe "no
    /// conflict" between each other's purge and grant.
    fn try_acquire(
        &self,
        session_id: SessionId,
        path: &str,
        kind: LockKind,
        conflicts_with: impl Fn(LockKind) -> bool,
    ) -> LockResult<LockOutcome> {
        let ttl_ms = lock_ttl_ms_for(path);
        let outcome = self
            .store
            .try_acquire_lock(session_id, path.to_string(), kind, ttl_ms, conflicts_with)
            .map_err(LockError::Storage)?;
        match outcome {
            LockAcquireOutcome::Granted(lock) => {
                tracing::debug!(session_id = %session_id, path, kind = %kind, ttl_ms, "lock granted");
                Ok(LockOutcome::Granted(lock))
            }
            LockAcquireOutcome::Conflict { conflicting_session } => {
                self.publish(Event::LockConflict {
                    session_id,
                    path: path.to_string(),
                    conflicting_session_id: conflicting_session,
                });
                Ok(LockOutcome::Conflict { path: path.to_string(), conflicting_session })
            }
        }
    }

    /// No-op if the lock has already expired (and thus is already absent).
    pub fn release(&self, lock_id: &LockId, session_id: &SessionId) -> LockResult<()> {
        self.store.release_lock(lock_id, session_id)?;
        Ok(())
    }

    pub fn release_all_for_session(&self, session_id: &SessionId) -> LockResult<()> {
        self.store.release_all_locks(session_id)?;
        Ok(())
    }

    /// Read-only preflight: which of `paths` currently have a live,
    /// conflicting lock held by a session other than `session_id`.
    pub fn get_conflicts(&self, session_id: SessionId, paths: &[String]) -> Vec<String> {
        let now = self.clock.epoch_ms();
        paths
            .iter()
            .filter(|path| {
                self.store
                    .list_live_locks(Some(path))
                    .iter()
                    .any(|l| l.session_id != session_id && l.is_live(now))
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "arbiter_tests.rs"]
mod tests;
