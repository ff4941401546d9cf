//! Write-write conflict. Two sessions race a write lock on the same path;
//! exactly one wins, the other observes an in-band conflict and a
//! `lockConflict` event is published for it.

use foreman_core::{Event, FakeClock, SessionId};
use foreman_locks::{LockArbiter, LockOutcome};
use foreman_storage::Store;
use std::sync::{Arc, Mutex};

#[test]
fn only_one_session_wins_a_write_write_race() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let store = Arc::new(Store::open_with_clock(dir.path(), clock).unwrap());

    let conflicts: Arc<Mutex<Vec<(SessionId, SessionId)>>> = Arc::new(Mutex::new(Vec::new()));
    let conflicts_clone = conflicts.clone();
    let publisher: foreman_core::EventPublisher = Arc::new(move |event: &Event| {
        if let Event::LockConflict { session_id, conflicting_session_id, .. } = event {
            conflicts_clone.lock().unwrap().push((*session_id, *conflicting_session_id));
        }
    });
    let arbiter = LockArbiter::new(store.clone(), FakeClock::new()).with_publisher(publisher);

    let session_a = SessionId::new();
    let session_b = SessionId::new();

    let outcome_a = arbiter.acquire_write_lock(session_a, "src/main.rs").unwrap();
    let outcome_b = arbiter.acquire_write_lock(session_b, "src/main.rs").unwrap();

    let granted_count = outcome_a.is_granted() as usize + outcome_b.is_granted() as usize;
    assert_eq!(granted_count, 1, "exactly one side should win the write lock");

    match (outcome_a, outcome_b) {
        (LockOutcome::Granted(_), LockOutcome::Conflict { conflicting_session, .. }) => {
            assert_eq!(conflicting_session, session_a);
        }
        (LockOutcome::Conflict { conflicting_session, .. }, LockOutcome::Granted(_)) => {
            assert_eq!(conflicting_session, session_b);
        }
        other => panic!("expected exactly one grant and one conflict, got {other:?}"),
    }

    let published = conflicts.lock().unwrap();
    assert_eq!(published.len(), 1, "the loser's conflict should be published exactly once");
}

#[test]
fn a_live_write_lock_blocks_a_read_lock_from_another_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open_with_clock(dir.path(), FakeClock::new()).unwrap());
    let arbiter = LockArbiter::new(store, FakeClock::new());

    let writer = SessionId::new();
    let reader = SessionId::new();

    assert!(arbiter.acquire_write_lock(writer, "Cargo.toml").unwrap().is_granted());
    let outcome = arbiter.acquire_read_lock(reader, "Cargo.toml").unwrap();
    assert!(matches!(outcome, LockOutcome::Conflict { conflicting_session, .. } if conflicting_session == writer));
}

#[test]
fn read_locks_from_different_sessions_do_not_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open_with_clock(dir.path(), FakeClock::new()).unwrap());
    let arbiter = LockArbiter::new(store, FakeClock::new());

    let session_a = SessionId::new();
    let session_b = SessionId::new();

    assert!(arbiter.acquire_read_lock(session_a, "README.md").unwrap().is_granted());
    assert!(arbiter.acquire_read_lock(session_b, "README.md").unwrap().is_granted());
}

#[test]
fn same_session_can_reacquire_its_own_write_lock() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open_with_clock(dir.path(), FakeClock::new()).unwrap());
    let arbiter = LockArbiter::new(store, FakeClock::new());

    let session = SessionId::new();
    assert!(arbiter.acquire_write_lock(session, "Cargo.lock").unwrap().is_granted());
    assert!(arbiter.acquire_write_lock(session, "Cargo.lock").unwrap().is_granted());
}
