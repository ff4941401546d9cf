// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-storage: the Persistence Store — write-ahead log, periodic
//! snapshot checkpointing, and the materialized state they reconstruct.

pub mod checkpoint;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod wal;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

impl From<wal::WalError> for StorageError {
    fn from(e: wal::WalError) -> Self {
        StorageError::Io(e.to_string())
    }
}

impl From<snapshot::SnapshotError> for StorageError {
    fn from(e: snapshot::SnapshotError) -> Self {
        StorageError::Io(e.to_string())
    }
}

pub use checkpoint::{Checkpointer, CheckpointError, CheckpointResult};
pub use state::MaterializedState;
pub use store::{LockAcquireOutcome, ProjectSummary, Store};
pub use wal::{Wal, WalEntry, WalError};
