// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Shared error taxonomy for the orchestration core.

use crate::session::{SessionId, SessionStatus};
use thiserror::Error;

/// Errors common to every layer of the orchestration core.
///
/// Per-tool errors are returned in-band to the model (see `foreman-tools`)
/// rather than raised through this type; this taxonomy covers engine- and
/// manager-level failures that are reported to the caller and, for a
/// running agent, drive the state-machine failure edge.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("lock conflict on {path}: held by {conflicting_session}")]
    LockConflict { path: String, conflicting_session: SessionId },

    #[error("path outside project bounds: {path}")]
    OutOfBounds { path: String },

    #[error("illegal transition from {from} to {to}")]
    IllegalTransition { from: SessionStatus, to: SessionStatus },

    #[error("not found: {id}")]
    NotFound { id: String },

    #[error("agent already running: {id}")]
    AlreadyRunning { id: SessionId },

    #[error("step limit exceeded")]
    StepLimitExceeded,

    #[error("cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("model stream error: {0}")]
    ModelStreamError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
