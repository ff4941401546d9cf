// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! The materialized, in-memory view rebuilt by replaying [`foreman_core::Event`]s.

mod locks;
mod messages;
mod progress;
mod sessions;
mod snapshots;

use foreman_core::{Event, Lock, LockId, Message, MessageId, ProgressEntry, ProgressEntryId, Session, SessionId, Snapshot, SnapshotId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the persistence layer knows, rebuilt from the WAL (or a
/// snapshot plus the WAL tail) on startup. Owns every record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    pub sessions: HashMap<SessionId, Session>,
    pub messages: HashMap<MessageId, Message>,
    pub progress: HashMap<ProgressEntryId, ProgressEntry>,
    pub locks: HashMap<LockId, Lock>,
    pub snapshots: HashMap<SnapshotId, Snapshot>,
}

impl MaterializedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Idempotent for every variant: replaying the same
    /// event twice (as can happen across a crash mid-flush) reaches the
    /// same state.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::SessionCreated { session } => sessions::apply_created(self, session),
            Event::SessionStatusChanged { session_id, to, at_ms, metadata, .. } => {
                sessions::apply_status_changed(self, session_id, *to, *at_ms, metadata)
            }
            Event::SessionDeleted { session_id } => sessions::apply_deleted(self, session_id),

            Event::MessageAdded { message } => messages::apply_added(self, message),
            Event::MessageResultUpdated { message_id, tool_result } => {
                messages::apply_result_updated(self, message_id, tool_result)
            }

            Event::ProgressRecorded { entry } => progress::apply_recorded(self, entry),

            Event::LockAcquired { lock } => locks::apply_acquired(self, lock),
            Event::LockReleased { lock_id, .. } => locks::apply_released(self, lock_id),

            Event::SnapshotCaptured { snapshot } => snapshots::apply_captured(self, snapshot),
            Event::SnapshotAfterRecorded { snapshot_id, after_content } => {
                snapshots::apply_after_recorded(self, snapshot_id, after_content.clone())
            }
            Event::SnapshotStatusChanged { snapshot_id, status } => {
                snapshots::apply_status_changed(self, snapshot_id, *status)
            }

            // Notification-only events carry no state mutation.
            Event::LockConflict { .. }
            | Event::StepStarted { .. }
            | Event::StepCompleted { .. }
            | Event::StepFailed { .. }
            | Event::ExecutionComplete { .. }
            | Event::ExecutionAborted { .. } => {}
        }
    }

    pub fn get_session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_snapshot(&self, id: &SnapshotId) -> Option<&Snapshot> {
        self.snapshots.get(id)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
