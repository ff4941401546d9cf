// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::MaterializedState;
use foreman_core::ProgressEntry;

pub fn apply_recorded(state: &mut MaterializedState, entry: &ProgressEntry) {
    state.progress.entry(entry.id).or_insert_with(|| entry.clone());
}
