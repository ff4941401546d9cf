// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-tools: the Tool Surface — the nine filesystem tools a model may
//! invoke, each mediated by the lock arbiter and the snapshot journal,
//! bounded to a session's project path.

pub mod ignore;
pub mod schema;
pub mod surface;

pub use schema::{catalogue, ToolSchema};
pub use surface::{TerminalSignal, ToolContext, ToolOutcome, ToolSurface};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("lock error: {0}")]
    Lock(#[from] foreman_locks::LockError),
    #[error("journal error: {0}")]
    Journal(#[from] foreman_journal::JournalError),
    #[error("storage error: {0}")]
    Storage(#[from] foreman_storage::StorageError),
    #[error("I/O error at {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("write verification failed at {0}: content on disk does not match bytes written")]
    VerificationFailed(String),
    #[error("missing required argument: {0}")]
    MissingArg(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

pub type ToolResult<T> = Result<T, ToolError>;
