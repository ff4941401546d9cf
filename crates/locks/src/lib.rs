// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-locks: the Lock Arbiter — read/write lock acquisition over
//! paths across sessions, TTL-based expiry, and conflict notification.

pub mod arbiter;

pub use arbiter::{LockArbiter, LockOutcome};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("storage error: {0}")]
    Storage(#[from] foreman_storage::StorageError),
}

pub type LockResult<T> = Result<T, LockError>;
