// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::MaterializedState;
use foreman_core::{Lock, LockId};

pub fn apply_acquired(state: &mut MaterializedState, lock: &Lock) {
    state.locks.insert(lock.id, lock.clone());
}

pub fn apply_released(state: &mut MaterializedState, lock_id: &LockId) {
    state.locks.remove(lock_id);
}
