// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::*;
use crate::session::SessionId;

#[test]
fn lock_conflict_publishes_on_lock_conflict_topic() {
    let event = Event::LockConflict {
        session_id: SessionId::new(),
        path: "/p/a.txt".into(),
        conflicting_session_id: SessionId::new(),
    };
    assert_eq!(event.topic(), Some(Topic::LockConflict));
}

#[test]
fn lock_acquired_has_no_bus_topic() {
    let event = Event::LockReleased { lock_id: crate::lock::LockId::new(), session_id: SessionId::new() };
    assert_eq!(event.topic(), None);
}

#[test]
fn session_created_publishes_agent_created() {
    let session = crate::session::Session::builder().build();
    let event = Event::SessionCreated { session };
    assert_eq!(event.topic(), Some(Topic::AgentCreated));
    assert_eq!(event.name(), "session_created");
}
