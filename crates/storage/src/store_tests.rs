// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::*;
use foreman_core::{FakeClock, LockKind, MessageRole, ProgressStatus, SnapshotOp, SnapshotStatus};
use serde_json::{json, Value};
use tempfile::tempdir;

fn store(clock: FakeClock) -> (tempfile::TempDir, Store<FakeClock>) {
    let dir = tempdir().unwrap();
    let store = Store::open_with_clock(dir.path(), clock).unwrap();
    (dir, store)
}

#[test]
fn create_session_then_get_session_round_trips() {
    let (_dir, store) = store(FakeClock::new());
    let session = store
        .create_session("agent".to_string(), None, "/p".to_string(), None, None)
        .unwrap();
    let fetched = store.get_session(&session.id).unwrap();
    assert_eq!(fetched.id, session.id);
    assert_eq!(fetched.status, SessionStatus::Ideas);
    assert_eq!(fetched.project_path, "/p");
}

#[test]
fn list_sessions_is_newest_first_and_filters() {
    let (_dir, store) = store(FakeClock::new());
    let a = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    let b = store.create_session("b".to_string(), None, "/q".to_string(), None, None).unwrap();

    let all = store.list_sessions(None, None);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, b.id);
    assert_eq!(all[1].id, a.id);

    let for_p = store.list_sessions(Some("/p"), None);
    assert_eq!(for_p.len(), 1);
    assert_eq!(for_p[0].id, a.id);
}

#[test]
fn update_session_status_persists_and_reopens_from_wal() {
    let clock = FakeClock::new();
    let dir = tempdir().unwrap();
    let session_id = {
        let store = Store::open_with_clock(dir.path(), clock.clone()).unwrap();
        let session = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
        store.update_session_status(&session.id, SessionStatus::Todo, Value::Null).unwrap();
        session.id
    };

    // Reopen without a snapshot: the WAL alone must reconstruct the status.
    let reopened = Store::open_with_clock(dir.path(), clock).unwrap();
    let session = reopened.get_session(&session_id).unwrap();
    assert_eq!(session.status, SessionStatus::Todo);
}

#[test]
fn delete_session_removes_it_from_the_materialized_view() {
    let (_dir, store) = store(FakeClock::new());
    let session = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    store.delete_session(&session.id).unwrap();
    assert!(store.get_session(&session.id).is_none());
}

#[test]
fn add_message_and_get_messages_orders_by_step_then_timestamp() {
    let (_dir, store) = store(FakeClock::new());
    let session = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    store.add_message(session.id, MessageRole::User, "first".to_string(), None, 1).unwrap();
    store.add_message(session.id, MessageRole::Assistant, "second".to_string(), None, 2).unwrap();

    let messages = store.get_messages(&session.id, None);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "first");
    assert_eq!(messages[1].content, "second");

    let limited = store.get_messages(&session.id, Some(1));
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].content, "first");
}

#[test]
fn update_message_result_attaches_tool_result() {
    let (_dir, store) = store(FakeClock::new());
    let session = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    let message = store
        .add_message(
            session.id,
            MessageRole::Assistant,
            String::new(),
            Some(json!({"id": "call-1", "name": "readFile"})),
            1,
        )
        .unwrap();
    store.update_message_result(&message.id, json!({"ok": true})).unwrap();

    let found = store.find_message_by_tool_call_id(&session.id, "call-1").unwrap();
    assert_eq!(found.tool_result, Some(json!({"ok": true})));
}

#[test]
fn add_progress_and_get_progress_is_ordered_by_timestamp() {
    let clock = FakeClock::new();
    let (_dir, store) = store(clock.clone());
    let session = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    store.add_progress(session.id, "step1".to_string(), ProgressStatus::Completed, None).unwrap();
    clock.advance(std::time::Duration::from_millis(10));
    store.add_progress(session.id, "step2".to_string(), ProgressStatus::Running, None).unwrap();

    let progress = store.get_progress(&session.id);
    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].step, "step1");
    assert_eq!(progress[1].step, "step2");
}

#[test]
fn acquire_and_release_lock() {
    let (_dir, store) = store(FakeClock::new());
    let session = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    let lock = store.acquire_lock(session.id, "/p/a.txt".to_string(), LockKind::Write, 5_000).unwrap();
    assert_eq!(store.list_live_locks(Some("/p/a.txt")).len(), 1);

    store.release_lock(&lock.id, &session.id).unwrap();
    assert_eq!(store.list_live_locks(Some("/p/a.txt")).len(), 0);
}

#[test]
fn release_all_locks_clears_every_lock_for_a_session() {
    let (_dir, store) = store(FakeClock::new());
    let session = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    store.acquire_lock(session.id, "/p/a.txt".to_string(), LockKind::Write, 5_000).unwrap();
    store.acquire_lock(session.id, "/p/b.txt".to_string(), LockKind::Read, 5_000).unwrap();

    store.release_all_locks(&session.id).unwrap();
    assert!(store.list_live_locks(Some("/p/a.txt")).is_empty());
    assert!(store.list_live_locks(Some("/p/b.txt")).is_empty());
}

#[test]
fn list_live_locks_excludes_expired_rows() {
    let clock = FakeClock::new();
    let (_dir, store) = store(clock.clone());
    let session = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    store.acquire_lock(session.id, "/p/a.txt".to_string(), LockKind::Write, 1_000).unwrap();

    assert_eq!(store.list_live_locks(Some("/p/a.txt")).len(), 1);
    clock.advance(std::time::Duration::from_millis(1_001));
    assert!(store.list_live_locks(Some("/p/a.txt")).is_empty());
    // The row itself is still physically present until the arbiter purges it.
    assert_eq!(store.list_all_locks(Some("/p/a.txt")).len(), 1);
}

#[test]
fn add_snapshot_and_set_after_then_bulk_status_update() {
    let (_dir, store) = store(FakeClock::new());
    let session = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    let snapshot = store
        .add_snapshot(session.id, "/p/a.txt".to_string(), SnapshotOp::Create, None, 1)
        .unwrap();
    store.set_snapshot_after(&snapshot.id, Some(b"hello".to_vec())).unwrap();

    store.bulk_set_snapshot_status(&[snapshot.id], SnapshotStatus::Accepted).unwrap();
    let accepted = store.list_snapshots(&session.id, Some(SnapshotStatus::Accepted));
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].after_content, Some(b"hello".to_vec()));
}

#[test]
fn list_project_summaries_aggregates_across_sessions() {
    let (_dir, store) = store(FakeClock::new());
    let a = store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    store.create_session("b".to_string(), None, "/p".to_string(), None, None).unwrap();
    store.update_session_status(&a.id, SessionStatus::Todo, Value::Null).unwrap();
    store.update_session_status(&a.id, SessionStatus::Doing, Value::Null).unwrap();

    let summaries = store.list_project_summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].agent_count, 2);
    assert_eq!(summaries[0].running_agents, 1);
}

#[test]
fn delete_inactive_projects_cascades_by_project_not_session() {
    let clock = FakeClock::new();
    let (_dir, store) = store(clock.clone());
    // Stale project: both of its sessions predate the cutoff, including one
    // created before the other so we know cascading isn't keyed on index.
    let stale_old = store.create_session("old".to_string(), None, "/stale".to_string(), None, None).unwrap();
    let stale_newer =
        store.create_session("old2".to_string(), None, "/stale".to_string(), None, None).unwrap();
    clock.advance(std::time::Duration::from_millis(2 * 24 * 60 * 60 * 1000));
    // Active project: one old session, but the project as a whole has recent
    // activity via its second session, so neither should be removed.
    let active_old = store.create_session("a1".to_string(), None, "/active".to_string(), None, None).unwrap();
    let active_fresh =
        store.create_session("a2".to_string(), None, "/active".to_string(), None, None).unwrap();

    let removed = store.delete_inactive_projects(1).unwrap();
    assert_eq!(removed, 2);
    assert!(store.get_session(&stale_old.id).is_none());
    assert!(store.get_session(&stale_newer.id).is_none());
    assert!(store.get_session(&active_old.id).is_some());
    assert!(store.get_session(&active_fresh.id).is_some());
}

#[test]
fn flush_checkpoints_and_truncates_the_wal() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let store = Store::open_with_clock(dir.path(), clock.clone()).unwrap();
    store.create_session("a".to_string(), None, "/p".to_string(), None, None).unwrap();
    store.flush().unwrap();

    let reopened = Store::open_with_clock(dir.path(), clock).unwrap();
    assert_eq!(reopened.list_sessions(None, None).len(), 1);
}
