// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-journal: the Snapshot Journal — captures pre/post content for
//! every mutating file operation so that the human review decision at
//! session end (`acceptAll`/`revertAll`) is a pure function over the
//! journal.

pub mod journal;

pub use journal::Journal;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("storage error: {0}")]
    Storage(#[from] foreman_storage::StorageError),
    #[error("I/O error at {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}

pub type JournalResult<T> = Result<T, JournalError>;
