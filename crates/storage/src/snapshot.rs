// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! A point-in-time checkpoint of [`crate::MaterializedState`], compressed
//! and written durably by [`crate::checkpoint::Checkpointer`].

use crate::state::MaterializedState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Bumped whenever the shape of `MaterializedState` changes incompatibly.
/// There is no migration registry (yet) — a version mismatch on load is
/// treated as absent, and the WAL replays the full history from scratch.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// Keep at most this many rotated backups of a corrupt file.
const MAX_BAK_FILES: usize = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub seq: u64,
    pub state: MaterializedState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(seq: u64, state: MaterializedState) -> Self {
        Self { version: CURRENT_SNAPSHOT_VERSION, seq, state, created_at: Utc::now() }
    }
}

/// Rotate `path` to `path.bak`, shifting any existing `.bak`, `.bak.2`,
/// `.bak.3` up by one and dropping anything older than `MAX_BAK_FILES`.
pub fn rotate_bak_path(path: &Path) -> Result<(), std::io::Error> {
    if !path.exists() {
        return Ok(());
    }
    for i in (1..MAX_BAK_FILES).rev() {
        let from = bak_path(path, i);
        let to = bak_path(path, i + 1);
        if from.exists() {
            std::fs::rename(&from, &to)?;
        }
    }
    std::fs::rename(path, bak_path(path, 1))?;
    Ok(())
}

fn bak_path(path: &Path, n: usize) -> std::path::PathBuf {
    if n == 1 {
        let mut s = path.as_os_str().to_owned();
        s.push(".bak");
        s.into()
    } else {
        let mut s = path.as_os_str().to_owned();
        s.push(format!(".bak.{n}"));
        s.into()
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
