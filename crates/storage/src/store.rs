// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `Store`: the Persistence Store facade.
//!
//! A single embedded store (WAL + periodic zstd-compressed snapshot)
//! standing in for "an embedded relational store with write-ahead logging
//! enabled for reader/writer concurrency" — the schema mirrors the data
//! model one-to-one and every write goes through the log before the
//! in-memory materialized view is updated, giving the same durability and
//! crash-recovery properties a WAL-mode embedded SQL engine would.

use crate::checkpoint::{CheckpointHandle, Checkpointer};
use crate::snapshot::load_snapshot;
use crate::state::MaterializedState;
use crate::wal::Wal;
use crate::StorageError;
use foreman_core::{
    Clock, Event, Lock, LockId, LockKind, Message, MessageId, MessageRole, ProgressEntry,
    ProgressEntryId, ProgressStatus, Session, SessionId, SessionStatus, Snapshot, SnapshotId,
    SnapshotOp, SnapshotStatus,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Checkpoint after this many appended events, amortising the zstd +
/// fsync cost of a checkpoint over a batch of writes.
const CHECKPOINT_EVERY: u64 = 500;

struct Inner {
    state: MaterializedState,
    wal: Wal,
    last_checkpoint_seq: u64,
    pending_checkpoint: Option<CheckpointHandle>,
}

/// Outcome of [`Store::try_acquire_lock`].
#[derive(Debug, Clone)]
pub enum LockAcquireOutcome {
    Granted(Lock),
    Conflict { conflicting_session: SessionId },
}

/// Summary row for `listProjectSummaries`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project_path: String,
    pub project_name: Option<String>,
    pub agent_count: usize,
    pub last_activity_ms: u64,
    pub running_agents: usize,
}

pub struct Store<C: Clock = foreman_core::SystemClock> {
    inner: Mutex<Inner>,
    checkpointer: Checkpointer,
    clock: C,
}

impl Store<foreman_core::SystemClock> {
    /// Open (or create) a store rooted at `dir`, containing `wal.log` and
    /// `snapshot.zst`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with_clock(dir, foreman_core::SystemClock)
    }
}

impl<C: Clock> Store<C> {
    pub fn open_with_clock(dir: impl AsRef<Path>, clock: C) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let snapshot_path: PathBuf = dir.join("snapshot.zst");
        let wal_path = dir.join("wal.log");

        let (mut state, snapshot_seq) = match load_snapshot(&snapshot_path)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (MaterializedState::new(), 0),
        };

        let mut wal = Wal::open(&wal_path, snapshot_seq)?;
        for entry in wal.entries_after(snapshot_seq)? {
            state.apply_event(&entry.event);
            wal.mark_processed(entry.seq);
        }

        let checkpointer = Checkpointer::new(snapshot_path);

        Ok(Self {
            inner: Mutex::new(Inner { state, wal, last_checkpoint_seq: snapshot_seq, pending_checkpoint: None }),
            checkpointer,
            clock,
        })
    }

    fn append(&self, inner: &mut Inner, event: Event) -> Result<(), StorageError> {
        let seq = inner.wal.append(&event)?;
        inner.state.apply_event(&event);
        inner.wal.mark_processed(seq);
        self.maybe_checkpoint(inner, seq);
        Ok(())
    }

    /// Opportunistically advance the checkpoint/truncate cycle. Never
    /// blocks the caller: it only starts a new checkpoint if the previous
    /// one (if any) has already completed, and only truncates once a
    /// completed checkpoint is observed.
    fn maybe_checkpoint(&self, inner: &mut Inner, seq: u64) {
        if let Some(handle) = inner.pending_checkpoint.take() {
            match handle.try_wait() {
                Some(Ok(result)) => {
                    if let Err(e) = inner.wal.truncate_before(result.seq) {
                        tracing::warn!(error = %e, "WAL truncate after checkpoint failed");
                    } else {
                        inner.last_checkpoint_seq = result.seq;
                    }
                }
                Some(Err(e)) => tracing::warn!(error = %e, "checkpoint failed"),
                None => inner.pending_checkpoint = Some(handle),
            }
        }
        if inner.pending_checkpoint.is_none() && seq.saturating_sub(inner.last_checkpoint_seq) >= CHECKPOINT_EVERY {
            inner.pending_checkpoint = Some(self.checkpointer.start(seq, &inner.state));
        }
    }

    /// Block until any in-flight checkpoint completes and truncate the
    /// WAL. Intended for a clean shutdown path.
    pub fn flush(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if let Some(handle) = inner.pending_checkpoint.take() {
            let result = handle.wait().map_err(|e| StorageError::Io(e.to_string()))?;
            inner.wal.truncate_before(result.seq)?;
            inner.last_checkpoint_seq = result.seq;
        }
        let seq = inner.wal.write_seq();
        let result = self
            .checkpointer
            .checkpoint_sync(seq, &inner.state)
            .map_err(|e| StorageError::Io(e.to_string()))?;
        inner.wal.truncate_before(result.seq)?;
        inner.last_checkpoint_seq = result.seq;
        Ok(())
    }

    // ---- Sessions ----

    pub fn create_session(
        &self,
        name: String,
        description: Option<String>,
        project_path: String,
        project_name: Option<String>,
        workspace_root: Option<String>,
    ) -> Result<Session, StorageError> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let session = Session {
            id: SessionId::new(),
            name,
            description,
            status: SessionStatus::Ideas,
            project_path,
            project_name,
            workspace_root,
            created_at_ms: now,
            updated_at_ms: now,
            started_at_ms: None,
            completed_at_ms: None,
            metadata: Value::Null,
        };
        self.append(&mut inner, Event::SessionCreated { session: session.clone() })?;
        Ok(session)
    }

    pub fn get_session(&self, id: &SessionId) -> Option<Session> {
        self.inner.lock().state.get_session(id).cloned()
    }

    /// Newest-first by `created_at_ms`.
    pub fn list_sessions(&self, project_path: Option<&str>, status: Option<SessionStatus>) -> Vec<Session> {
        let inner = self.inner.lock();
        let mut sessions: Vec<Session> = inner
            .state
            .sessions
            .values()
            .filter(|s| project_path.map_or(true, |p| s.project_path == p))
            .filter(|s| status.map_or(true, |st| s.status == st))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        sessions
    }

    pub fn update_session_status(
        &self,
        id: &SessionId,
        status: SessionStatus,
        metadata: Value,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let Some(session) = inner.state.get_session(id).cloned() else {
            return Err(StorageError::NotFound(id.to_string()));
        };
        let now = self.clock.epoch_ms();
        self.append(
            &mut inner,
            Event::SessionStatusChanged { session_id: *id, from: session.status, to: status, at_ms: now, metadata },
        )
    }

    pub fn delete_session(&self, id: &SessionId) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        self.append(&mut inner, Event::SessionDeleted { session_id: *id })
    }

    // ---- Messages ----

    pub fn add_message(
        &self,
        session_id: SessionId,
        role: MessageRole,
        content: String,
        tool_call: Option<Value>,
        step_index: u64,
    ) -> Result<Message, StorageError> {
        let mut inner = self.inner.lock();
        let message = Message {
            id: MessageId::new(),
            session_id,
            role,
            content,
            tool_call,
            tool_result: None,
            step_index,
            timestamp_ms: self.clock.epoch_ms(),
        };
        self.append(&mut inner, Event::MessageAdded { message: message.clone() })?;
        Ok(message)
    }

    /// Ordered by `(step_index, timestamp_ms)`, optionally capped at `limit`.
    pub fn get_messages(&self, session_id: &SessionId, limit: Option<usize>) -> Vec<Message> {
        let inner = self.inner.lock();
        let mut messages: Vec<Message> =
            inner.state.messages.values().filter(|m| m.session_id == *session_id).cloned().collect();
        messages.sort_by(|a, b| (a.step_index, a.timestamp_ms).cmp(&(b.step_index, b.timestamp_ms)));
        if let Some(limit) = limit {
            messages.truncate(limit);
        }
        messages
    }

    pub fn update_message_result(&self, message_id: &MessageId, tool_result: Value) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        self.append(&mut inner, Event::MessageResultUpdated { message_id: *message_id, tool_result })
    }

    pub fn find_message_by_tool_call_id(&self, session_id: &SessionId, tool_call_id: &str) -> Option<Message> {
        let inner = self.inner.lock();
        inner
            .state
            .messages
            .values()
            .find(|m| {
                m.session_id == *session_id
                    && m.tool_call
                        .as_ref()
                        .and_then(|v| v.get("id"))
                        .and_then(|v| v.as_str())
                        .is_some_and(|id| id == tool_call_id)
            })
            .cloned()
    }

    // ---- Progress ----

    pub fn add_progress(
        &self,
        session_id: SessionId,
        step: String,
        status: ProgressStatus,
        details: Option<String>,
    ) -> Result<ProgressEntry, StorageError> {
        let mut inner = self.inner.lock();
        let entry = ProgressEntry {
            id: ProgressEntryId::new(),
            session_id,
            step,
            status,
            details,
            timestamp_ms: self.clock.epoch_ms(),
        };
        self.append(&mut inner, Event::ProgressRecorded { entry: entry.clone() })?;
        Ok(entry)
    }

    pub fn get_progress(&self, session_id: &SessionId) -> Vec<ProgressEntry> {
        let inner = self.inner.lock();
        let mut entries: Vec<ProgressEntry> =
            inner.state.progress.values().filter(|p| p.session_id == *session_id).cloned().collect();
        entries.sort_by_key(|p| p.timestamp_ms);
        entries
    }

    // ---- Locks ----

    pub fn acquire_lock(&self, session_id: SessionId, path: String, kind: LockKind, ttl_ms: u64) -> Result<Lock, StorageError> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let lock = Lock { id: LockId::new(), session_id, path, kind, acquired_at_ms: now, expires_at_ms: now + ttl_ms };
        self.append(&mut inner, Event::LockAcquired { lock: lock.clone() })?;
        Ok(lock)
    }

    /// Purge-expired, conflict-check, and insert as one atomic step under a
    /// single acquisition of `Inner`'s mutex, so two concurrent callers
    /// racing for the same path can never both observe "no conflict" and
    /// both grant. This is the serialization point the lock table requires;
    /// the arbiter's acquisition rules (read blocked only by a live write
    /// from another session, write blocked by any live lock from another
    /// session, same-session reacquisition always wins) are expressed here
    /// as the `conflicts_with` predicate the caller supplies.
    pub fn try_acquire_lock(
        &self,
        session_id: SessionId,
        path: String,
        kind: LockKind,
        ttl_ms: u64,
        conflicts_with: impl Fn(LockKind) -> bool,
    ) -> Result<LockAcquireOutcome, StorageError> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();

        let expired: Vec<(LockId, SessionId)> = inner
            .state
            .locks
            .values()
            .filter(|l| l.path == path && !l.is_live(now))
            .map(|l| (l.id, l.session_id))
            .collect();
        for (lock_id, owner) in expired {
            self.append(&mut inner, Event::LockReleased { lock_id, session_id: owner })?;
        }

        let conflict = inner
            .state
            .locks
            .values()
            .find(|l| l.path == path && l.is_live(now) && l.session_id != session_id && conflicts_with(l.kind))
            .map(|l| l.session_id);
        if let Some(conflicting_session) = conflict {
            return Ok(LockAcquireOutcome::Conflict { conflicting_session });
        }

        let lock = Lock { id: LockId::new(), session_id, path, kind, acquired_at_ms: now, expires_at_ms: now + ttl_ms };
        self.append(&mut inner, Event::LockAcquired { lock: lock.clone() })?;
        Ok(LockAcquireOutcome::Granted(lock))
    }

    pub fn release_lock(&self, lock_id: &LockId, session_id: &SessionId) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        self.append(&mut inner, Event::LockReleased { lock_id: *lock_id, session_id: *session_id })
    }

    pub fn release_all_locks(&self, session_id: &SessionId) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let ids: Vec<LockId> = inner.state.locks.values().filter(|l| l.session_id == *session_id).map(|l| l.id).collect();
        for id in ids {
            self.append(&mut inner, Event::LockReleased { lock_id: id, session_id: *session_id })?;
        }
        Ok(())
    }

    /// Live locks, optionally filtered to one path; purges expired rows
    /// from the view as a side effect of the `expires_at_ms > now` check
    /// (the lock arbiter is responsible for physically releasing them).
    pub fn list_live_locks(&self, path: Option<&str>) -> Vec<Lock> {
        let inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        inner
            .state
            .locks
            .values()
            .filter(|l| l.is_live(now))
            .filter(|l| path.map_or(true, |p| l.path == p))
            .cloned()
            .collect()
    }

    /// Every lock row for `path` regardless of liveness, so the lock
    /// arbiter can physically purge expired rows before deciding grants.
    pub fn list_all_locks(&self, path: Option<&str>) -> Vec<Lock> {
        let inner = self.inner.lock();
        inner.state.locks.values().filter(|l| path.map_or(true, |p| l.path == p)).cloned().collect()
    }

    // ---- Snapshots ----

    pub fn add_snapshot(
        &self,
        session_id: SessionId,
        path: String,
        op: SnapshotOp,
        before_content: Option<Vec<u8>>,
        step_index: u64,
    ) -> Result<Snapshot, StorageError> {
        let mut inner = self.inner.lock();
        let snapshot = Snapshot {
            id: SnapshotId::new(),
            session_id,
            path,
            op,
            before_content,
            after_content: None,
            status: SnapshotStatus::Pending,
            step_index,
            timestamp_ms: self.clock.epoch_ms(),
        };
        self.append(&mut inner, Event::SnapshotCaptured { snapshot: snapshot.clone() })?;
        Ok(snapshot)
    }

    pub fn set_snapshot_after(&self, snapshot_id: &SnapshotId, after_content: Option<Vec<u8>>) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        self.append(&mut inner, Event::SnapshotAfterRecorded { snapshot_id: *snapshot_id, after_content })
    }

    pub fn list_snapshots(&self, session_id: &SessionId, status: Option<SnapshotStatus>) -> Vec<Snapshot> {
        let inner = self.inner.lock();
        let mut snapshots: Vec<Snapshot> = inner
            .state
            .snapshots
            .values()
            .filter(|s| s.session_id == *session_id)
            .filter(|s| status.map_or(true, |st| s.status == st))
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.step_index);
        snapshots
    }

    pub fn bulk_set_snapshot_status(&self, ids: &[SnapshotId], status: SnapshotStatus) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        for id in ids {
            self.append(&mut inner, Event::SnapshotStatusChanged { snapshot_id: *id, status })?;
        }
        Ok(())
    }

    // ---- Project-level views ----

    pub fn list_project_summaries(&self) -> Vec<ProjectSummary> {
        let inner = self.inner.lock();
        let mut by_path: std::collections::HashMap<String, ProjectSummary> = std::collections::HashMap::new();
        for session in inner.state.sessions.values() {
            let summary = by_path.entry(session.project_path.clone()).or_insert_with(|| ProjectSummary {
                project_path: session.project_path.clone(),
                project_name: session.project_name.clone(),
                agent_count: 0,
                last_activity_ms: 0,
                running_agents: 0,
            });
            summary.agent_count += 1;
            summary.last_activity_ms = summary.last_activity_ms.max(session.updated_at_ms);
            if session.is_running() {
                summary.running_agents += 1;
            }
        }
        by_path.into_values().collect()
    }

    /// Delete sessions (and cascade their child records) whose project has
    /// had no activity within `days`.
    pub fn delete_inactive_projects(&self, days: u64) -> Result<usize, StorageError> {
        let cutoff = self.clock.epoch_ms().saturating_sub(days * 24 * 60 * 60 * 1000);
        let stale_paths: std::collections::HashSet<String> = self
            .list_project_summaries()
            .into_iter()
            .filter(|p| p.last_activity_ms < cutoff)
            .map(|p| p.project_path)
            .collect();
        let stale_ids: Vec<SessionId> = {
            let inner = self.inner.lock();
            inner
                .state
                .sessions
                .values()
                .filter(|s| stale_paths.contains(&s.project_path))
                .map(|s| s.id)
                .collect()
        };
        let count = stale_ids.len();
        for id in stale_ids {
            self.delete_session(&id)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
