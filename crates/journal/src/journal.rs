// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `Journal`: capture/recordAfter/acceptAll/revertAll over the filesystem.
//!
//! Why accept re-applies rather than no-ops: it guarantees the on-disk
//! state at acceptance exactly matches the journalled intent even if the
//! file was touched out-of-band during the session.

use foreman_core::{Clock, SessionId, Snapshot, SnapshotId, SnapshotOp, SnapshotStatus};
use foreman_storage::Store;
use std::path::Path;
use std::sync::Arc;

use crate::{JournalError, JournalResult};

pub struct Journal<C: Clock = foreman_core::SystemClock> {
    store: Arc<Store<C>>,
}

impl<C: Clock> Journal<C> {
    pub fn new(store: Arc<Store<C>>) -> Self {
        Self { store }
    }

    fn io_err(path: &str, source: std::io::Error) -> JournalError {
        JournalError::Io { path: path.to_string(), source }
    }

    /// Capture a snapshot BEFORE the operation executes. For `update`/
    /// `delete`, reads the current on-disk bytes into `before_content`; a
    /// missing file is tolerated only for `create` (where there is no
    /// before-content to read in the first place).
    pub fn capture(
        &self,
        session_id: SessionId,
        path: &str,
        op: SnapshotOp,
        step_index: u64,
    ) -> JournalResult<Snapshot> {
        let before_content = match op {
            SnapshotOp::Create => None,
            SnapshotOp::Update | SnapshotOp::Delete => match std::fs::read(path) {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(path, op = %op, "capture: file missing, recording empty before-content");
                    None
                }
                Err(e) => return Err(Self::io_err(path, e)),
            },
        };
        let snapshot =
            self.store.add_snapshot(session_id, path.to_string(), op, before_content, step_index)?;
        Ok(snapshot)
    }

    /// Record the bytes written AFTER the operation executes.
    pub fn record_after(
        &self,
        snapshot_id: &SnapshotId,
        after_content: Option<Vec<u8>>,
    ) -> JournalResult<()> {
        self.store.set_snapshot_after(snapshot_id, after_content)?;
        Ok(())
    }

    pub fn list_for_session(&self, session_id: &SessionId, status: Option<SnapshotStatus>) -> Vec<Snapshot> {
        self.store.list_snapshots(session_id, status)
    }

    /// Idempotent: re-applies every `pending` snapshot's recorded intent to
    /// disk, in capture order, then marks it `accepted`. Calling this twice
    /// is a no-op the second time (no `pending` snapshots remain).
    pub fn accept_all(&self, session_id: &SessionId) -> JournalResult<()> {
        let pending = self.store.list_snapshots(session_id, Some(SnapshotStatus::Pending));
        let mut ids = Vec::with_capacity(pending.len());
        for snapshot in pending {
            self.apply_accept(&snapshot)?;
            ids.push(snapshot.id);
        }
        if !ids.is_empty() {
            self.store.bulk_set_snapshot_status(&ids, SnapshotStatus::Accepted)?;
        }
        Ok(())
    }

    fn apply_accept(&self, snapshot: &Snapshot) -> JournalResult<()> {
        match snapshot.op {
            SnapshotOp::Create | SnapshotOp::Update => {
                let bytes = snapshot.after_content.as_deref().unwrap_or(&[]);
                write_through(&snapshot.path, bytes).map_err(|e| Self::io_err(&snapshot.path, e))?;
            }
            SnapshotOp::Delete => match std::fs::remove_file(&snapshot.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Self::io_err(&snapshot.path, e)),
            },
        }
        Ok(())
    }

    /// Idempotent: processes `pending` snapshots in **descending**
    /// `step_index` order, undoing each mutation, then marks each
    /// `reverted`.
    pub fn revert_all(&self, session_id: &SessionId) -> JournalResult<()> {
        let mut pending = self.store.list_snapshots(session_id, Some(SnapshotStatus::Pending));
        pending.sort_by(|a, b| b.step_index.cmp(&a.step_index));
        let mut ids = Vec::with_capacity(pending.len());
        for snapshot in &pending {
            self.apply_revert(snapshot)?;
            ids.push(snapshot.id);
        }
        if !ids.is_empty() {
            self.store.bulk_set_snapshot_status(&ids, SnapshotStatus::Reverted)?;
        }
        Ok(())
    }

    fn apply_revert(&self, snapshot: &Snapshot) -> JournalResult<()> {
        match snapshot.op {
            SnapshotOp::Create => match std::fs::remove_file(&snapshot.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Self::io_err(&snapshot.path, e)),
            },
            SnapshotOp::Update | SnapshotOp::Delete => match &snapshot.before_content {
                Some(bytes) => {
                    write_through(&snapshot.path, bytes).map_err(|e| Self::io_err(&snapshot.path, e))?;
                }
                None => {
                    tracing::warn!(
                        path = %snapshot.path,
                        snapshot_id = %snapshot.id,
                        "revert: missing before-content, skipping file restore"
                    );
                }
            },
        }
        Ok(())
    }
}

/// Write `bytes` to `path`, creating parent directories as needed.
fn write_through(path: &str, bytes: &[u8]) -> std::io::Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
