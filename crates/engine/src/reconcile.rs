// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Startup reconciliation: a restart-time pass over non-terminal state.
//! Deliberately conservative — a session left `doing` after a crash is not
//! auto-resumed or auto-failed, only annotated, and waits for a human to
//! look at it.

use foreman_core::{Clock, ProgressStatus, SessionStatus};
use foreman_storage::{Store, StorageError};
use std::sync::Arc;

/// Annotate every session still `doing` after an unclean shutdown with a
/// recovery `ProgressEntry`. Returns the number of sessions annotated.
pub fn reconcile_doing_sessions<C: Clock>(store: &Arc<Store<C>>) -> Result<usize, StorageError> {
    let doing = store.list_sessions(None, Some(SessionStatus::Doing));
    for session in &doing {
        store.add_progress(
            session.id,
            "recovered".to_string(),
            ProgressStatus::Failed,
            Some("recovered: execution state unknown, awaiting human input".to_string()),
        )?;
        tracing::warn!(session_id = %session.id, "session was doing at startup, leaving as-is");
    }
    Ok(doing.len())
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
