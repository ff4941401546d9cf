// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::MaterializedState;
use foreman_core::{Snapshot, SnapshotId, SnapshotStatus};

pub fn apply_captured(state: &mut MaterializedState, snapshot: &Snapshot) {
    state.snapshots.entry(snapshot.id).or_insert_with(|| snapshot.clone());
}

pub fn apply_after_recorded(state: &mut MaterializedState, snapshot_id: &SnapshotId, after_content: Option<Vec<u8>>) {
    if let Some(snapshot) = state.snapshots.get_mut(snapshot_id) {
        snapshot.after_content = after_content;
    }
}

pub fn apply_status_changed(state: &mut MaterializedState, snapshot_id: &SnapshotId, status: SnapshotStatus) {
    if let Some(snapshot) = state.snapshots.get_mut(snapshot_id) {
        snapshot.status = status;
    }
}
