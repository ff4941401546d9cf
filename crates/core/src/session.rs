// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Session: one unit of autonomous work bound to a project.

use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    /// Unique identifier for a session (agent).
    pub struct SessionId("sess");
}

/// Lifecycle state of a session. See the transition table in `foreman-engine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ideas,
    Todo,
    Doing,
    Review,
    Accepted,
    Rejected,
    NeedClarification,
}

crate::simple_display! {
    SessionStatus {
        Ideas => "ideas",
        Todo => "todo",
        Doing => "doing",
        Review => "review",
        Accepted => "accepted",
        Rejected => "rejected",
        NeedClarification => "need_clarification",
    }
}

/// A durable, named unit of work holding a conversation with a model and
/// mutating files inside a fixed project boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: SessionStatus,
    /// Absolute, canonical path. Immutable after creation.
    pub project_path: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub workspace_root: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default)]
    pub started_at_ms: Option<u64>,
    #[serde(default)]
    pub completed_at_ms: Option<u64>,
    #[serde(default)]
    pub metadata: Value,
}

impl Session {
    /// Returns true if the session currently occupies a worker slot.
    pub fn is_running(&self) -> bool {
        matches!(self.status, SessionStatus::Doing)
    }
}

/// The lifecycle's exact transition table. Shared by `foreman-engine`
/// (model-driven transitions: `doing -> review`, `doing -> need_clarification`)
/// and `foreman-session` (user-driven transitions: `start`, accept/reject,
/// the `need_clarification -> todo` resume-on-message rule), so both
/// validate against a single source of truth instead of duplicating the
/// table.
pub fn validate_transition(from: SessionStatus, to: SessionStatus) -> Result<(), crate::CoreError> {
    use SessionStatus::*;
    let allowed = matches!(
        (from, to),
        (Ideas, Todo)
            | (Todo, Doing)
            | (NeedClarification, Doing)
            | (NeedClarification, Todo)
            | (Doing, Review)
            | (Doing, NeedClarification)
            | (Review, Accepted)
            | (Review, Rejected)
    );
    if allowed {
        Ok(())
    } else {
        Err(crate::CoreError::IllegalTransition { from, to })
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct SessionBuilder => Session {
        into {
            id: SessionId = SessionId::new(),
            name: String = "test session",
            project_path: String = "/tmp/project",
        }
        option {
            description: String = None,
            project_name: String = None,
            workspace_root: String = None,
            started_at_ms: u64 = None,
            completed_at_ms: u64 = None,
        }
        set {
            status: SessionStatus = SessionStatus::Ideas,
            created_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
            metadata: Value = Value::Null,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
