// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Shared test fixtures. Gated behind `test-support` so downstream crates
//! can depend on the builders without pulling them into release builds.

use crate::clock::FakeClock;
use crate::session::{Session, SessionStatus};

/// Builds a `Session` in `Doing` status with started/updated timestamps
/// consistent with `clock`, for tests that need a running agent fixture.
pub fn running_session(clock: &FakeClock, project_path: &str) -> Session {
    use crate::clock::Clock;
    let now = clock.epoch_ms();
    Session::builder()
        .project_path(project_path)
        .status(SessionStatus::Doing)
        .created_at_ms(now)
        .updated_at_ms(now)
        .build()
}
