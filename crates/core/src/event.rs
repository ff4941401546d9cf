// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! The append-only event vocabulary.
//!
//! Every mutation to session, message, progress, lock, and snapshot state
//! flows through one of these variants. `foreman-storage` replays them to
//! rebuild [`crate::MaterializedState`] and appends them to the write-ahead
//! log; `foreman-session` republishes the same values on the event bus.
//! A handful of variants (`LockConflict`, `ExecutionAborted`) carry no
//! state mutation of their own and exist purely as bus notifications —
//! `apply_event` treats them as no-ops.

use crate::lock::{Lock, LockId};
use crate::message::{Message, MessageId};
use crate::progress::ProgressEntry;
use crate::session::{Session, SessionId, SessionStatus};
use crate::snapshot::{Snapshot, SnapshotId, SnapshotStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// An append-only record of something that happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionCreated { session: Session },
    SessionStatusChanged { session_id: SessionId, from: SessionStatus, to: SessionStatus, at_ms: u64, metadata: Value },
    SessionDeleted { session_id: SessionId },

    MessageAdded { message: Message },
    MessageResultUpdated { message_id: MessageId, tool_result: Value },

    ProgressRecorded { entry: ProgressEntry },

    LockAcquired { lock: Lock },
    LockReleased { lock_id: LockId, session_id: SessionId },
    LockConflict { session_id: SessionId, path: String, conflicting_session_id: SessionId },

    SnapshotCaptured { snapshot: Snapshot },
    SnapshotAfterRecorded { snapshot_id: SnapshotId, after_content: Option<Vec<u8>> },
    SnapshotStatusChanged { snapshot_id: SnapshotId, status: SnapshotStatus },

    StepStarted { session_id: SessionId, step_index: u64 },
    StepCompleted { session_id: SessionId, step_index: u64 },
    StepFailed { session_id: SessionId, step_index: u64, reason: String },

    ExecutionComplete { session_id: SessionId },
    ExecutionAborted { session_id: SessionId, reason: String },
}

/// A sink that components below the event bus (`foreman-locks`,
/// `foreman-journal`, `foreman-engine`) publish notifications through
/// without depending on the bus's topic registry directly. `foreman-session`
/// hands each component a closure that forwards into its own registry.
pub type EventPublisher = Arc<dyn Fn(&Event) + Send + Sync>;

/// Event bus topic names, in the exact casing callers subscribe with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    StatusChanged,
    StepStarted,
    StepCompleted,
    StepFailed,
    LockConflict,
    NeedsClarification,
    ExecutionComplete,
    ExecutionAborted,
    AgentCreated,
    AgentDeleted,
    MessageAdded,
}

crate::simple_display! {
    Topic {
        StatusChanged => "statusChanged",
        StepStarted => "stepStarted",
        StepCompleted => "stepCompleted",
        StepFailed => "stepFailed",
        LockConflict => "lockConflict",
        NeedsClarification => "needsClarification",
        ExecutionComplete => "executionComplete",
        ExecutionAborted => "executionAborted",
        AgentCreated => "agentCreated",
        AgentDeleted => "agentDeleted",
        MessageAdded => "messageAdded",
    }
}

impl Event {
    /// The bus topic this event is fanned out on, if any.
    ///
    /// `SessionCreated`/`SessionDeleted` publish on `agentCreated`/
    /// `agentDeleted` to match the command-surface naming; a transition
    /// into `need_clarification` additionally republishes on
    /// `needsClarification` (see `foreman-session`).
    pub fn topic(&self) -> Option<Topic> {
        match self {
            Event::SessionCreated { .. } => Some(Topic::AgentCreated),
            Event::SessionDeleted { .. } => Some(Topic::AgentDeleted),
            Event::SessionStatusChanged { .. } => Some(Topic::StatusChanged),
            Event::MessageAdded { .. } => Some(Topic::MessageAdded),
            Event::MessageResultUpdated { .. } => None,
            Event::ProgressRecorded { .. } => None,
            Event::LockAcquired { .. } => None,
            Event::LockReleased { .. } => None,
            Event::LockConflict { .. } => Some(Topic::LockConflict),
            Event::SnapshotCaptured { .. } => None,
            Event::SnapshotAfterRecorded { .. } => None,
            Event::SnapshotStatusChanged { .. } => None,
            Event::StepStarted { .. } => Some(Topic::StepStarted),
            Event::StepCompleted { .. } => Some(Topic::StepCompleted),
            Event::StepFailed { .. } => Some(Topic::StepFailed),
            Event::ExecutionComplete { .. } => Some(Topic::ExecutionComplete),
            Event::ExecutionAborted { .. } => Some(Topic::ExecutionAborted),
        }
    }

    /// Structured logging fields, in the same spirit as the old `Effect::fields`.
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionCreated { .. } => "session_created",
            Event::SessionStatusChanged { .. } => "session_status_changed",
            Event::SessionDeleted { .. } => "session_deleted",
            Event::MessageAdded { .. } => "message_added",
            Event::MessageResultUpdated { .. } => "message_result_updated",
            Event::ProgressRecorded { .. } => "progress_recorded",
            Event::LockAcquired { .. } => "lock_acquired",
            Event::LockReleased { .. } => "lock_released",
            Event::LockConflict { .. } => "lock_conflict",
            Event::SnapshotCaptured { .. } => "snapshot_captured",
            Event::SnapshotAfterRecorded { .. } => "snapshot_after_recorded",
            Event::SnapshotStatusChanged { .. } => "snapshot_status_changed",
            Event::StepStarted { .. } => "step_started",
            Event::StepCompleted { .. } => "step_completed",
            Event::StepFailed { .. } => "step_failed",
            Event::ExecutionComplete { .. } => "execution_complete",
            Event::ExecutionAborted { .. } => "execution_aborted",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
