// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Lock: a time-bounded claim on a path granting read or write semantics.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a lock.
    pub struct LockId("lck-");
}

/// Read locks are shared; write locks are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    Read,
    Write,
}

crate::simple_display! {
    LockKind {
        Read => "read",
        Write => "write",
    }
}

/// A claim on `path` held by `session_id` until `expires_at_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    pub id: LockId,
    pub session_id: SessionId,
    pub path: String,
    pub kind: LockKind,
    pub acquired_at_ms: u64,
    pub expires_at_ms: u64,
}

impl Lock {
    /// A lock is "live" iff its expiry is strictly in the future of `now_ms`.
    pub fn is_live(&self, now_ms: u64) -> bool {
        self.expires_at_ms > now_ms
    }
}

/// Default lock TTL.
pub const DEFAULT_LOCK_TTL_MS: u64 = 30_000;

/// Shortened TTL for frequently-touched "common" paths, to minimise
/// head-of-line blocking on manifests and lock files.
pub const COMMON_PATH_LOCK_TTL_MS: u64 = 5_000;

/// Basenames treated as "common" paths eligible for the shortened TTL.
/// Configurable in principle; fixed here as the default set.
pub const COMMON_PATH_BASENAMES: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "Cargo.lock",
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "tsconfig.json",
    "tsconfig.base.json",
    "README.md",
];

/// TTL, in milliseconds, that a newly acquired lock on `path` should use.
pub fn lock_ttl_ms_for(path: &str) -> u64 {
    let basename = std::path::Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path);
    if COMMON_PATH_BASENAMES.contains(&basename) {
        COMMON_PATH_LOCK_TTL_MS
    } else {
        DEFAULT_LOCK_TTL_MS
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
