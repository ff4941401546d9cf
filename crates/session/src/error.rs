// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `SessionError`: the facade-level error taxonomy, `#[from]`-converting
//! every lower-crate error into one enum the way a supervisor's top-level
//! error wraps its adapter and storage failures.

use foreman_core::SessionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Storage(#[from] foreman_storage::StorageError),
    #[error("lock error: {0}")]
    Lock(#[from] foreman_locks::LockError),
    #[error("journal error: {0}")]
    Journal(#[from] foreman_journal::JournalError),
    #[error(transparent)]
    Core(#[from] foreman_core::CoreError),
    #[error("engine error: {0}")]
    Engine(#[from] foreman_engine::EngineError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("agent already running: {0}")]
    AlreadyRunning(SessionId),
    #[error("addMessage only accepts user or system roles")]
    InvalidRole,
    #[error("project path is not usable: {0}")]
    InvalidProject(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
