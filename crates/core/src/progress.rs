// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! ProgressEntry: append-only audit log of a session's steps.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a progress entry.
    pub struct ProgressEntryId("prg-");
}

/// Outcome of a step recorded in the progress log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

crate::simple_display! {
    ProgressStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// One entry in a session's append-only progress log. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: ProgressEntryId,
    pub session_id: SessionId,
    pub step: String,
    pub status: ProgressStatus,
    #[serde(default)]
    pub details: Option<String>,
    pub timestamp_ms: u64,
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct ProgressEntryBuilder => ProgressEntry {
        into {
            id: ProgressEntryId = ProgressEntryId::new(),
            step: String = "step",
        }
        set {
            session_id: SessionId = SessionId::new(),
            status: ProgressStatus = ProgressStatus::Pending,
            timestamp_ms: u64 = 0,
        }
        option {
            details: String = None,
        }
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
