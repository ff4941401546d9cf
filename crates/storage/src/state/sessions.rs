// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::MaterializedState;
use foreman_core::{Session, SessionId, SessionStatus};
use serde_json::Value;

pub fn apply_created(state: &mut MaterializedState, session: &Session) {
    state.sessions.entry(session.id).or_insert_with(|| session.clone());
}

pub fn apply_status_changed(
    state: &mut MaterializedState,
    session_id: &SessionId,
    to: SessionStatus,
    at_ms: u64,
    metadata: &Value,
) {
    if let Some(session) = state.sessions.get_mut(session_id) {
        session.status = to;
        session.updated_at_ms = at_ms;
        match to {
            SessionStatus::Doing if session.started_at_ms.is_none() => session.started_at_ms = Some(at_ms),
            SessionStatus::Review | SessionStatus::Accepted | SessionStatus::Rejected => {
                session.completed_at_ms = Some(at_ms)
            }
            _ => {}
        }
        if !metadata.is_null() {
            session.metadata = metadata.clone();
        }
    }
}

pub fn apply_deleted(state: &mut MaterializedState, session_id: &SessionId) {
    state.sessions.remove(session_id);
    state.messages.retain(|_, m| m.session_id != *session_id);
    state.progress.retain(|_, p| p.session_id != *session_id);
    state.locks.retain(|_, l| l.session_id != *session_id);
    state.snapshots.retain(|_, s| s.session_id != *session_id);
}
