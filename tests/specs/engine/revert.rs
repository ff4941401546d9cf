//! Revert ordering. A create/update/delete chain against the same path
//! must unwind in descending `step_index` order so each undo sees the
//! on-disk state its matching capture actually saw.

use foreman_core::{FakeClock, SessionId, SnapshotOp};
use foreman_journal::Journal;
use foreman_storage::Store;
use std::sync::Arc;

#[test]
fn revert_all_unwinds_create_update_delete_in_descending_step_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open_with_clock(dir.path(), FakeClock::new()).unwrap());
    let journal = Journal::new(store.clone());
    let session_id = SessionId::new();
    let path = dir.path().join("notes.txt");
    let path_str = path.to_str().unwrap().to_string();

    // step 1: create with content "X"
    let created = journal.capture(session_id, &path_str, SnapshotOp::Create, 1).unwrap();
    std::fs::write(&path, "X").unwrap();
    journal.record_after(&created.id, Some(b"X".to_vec())).unwrap();

    // step 2: update "X" -> "Y"
    let updated = journal.capture(session_id, &path_str, SnapshotOp::Update, 2).unwrap();
    std::fs::write(&path, "Y").unwrap();
    journal.record_after(&updated.id, Some(b"Y".to_vec())).unwrap();

    // step 3: delete (before-content "Y")
    let deleted = journal.capture(session_id, &path_str, SnapshotOp::Delete, 3).unwrap();
    std::fs::remove_file(&path).unwrap();
    journal.record_after(&deleted.id, None).unwrap();

    assert!(!path.exists());

    journal.revert_all(&session_id).unwrap();

    assert!(!path.exists(), "reverting the create step should leave the file absent");

    let remaining = journal.list_for_session(&session_id, Some(foreman_core::SnapshotStatus::Pending));
    assert!(remaining.is_empty(), "every snapshot should be marked reverted, none left pending");

    let reverted = journal.list_for_session(&session_id, Some(foreman_core::SnapshotStatus::Reverted));
    assert_eq!(reverted.len(), 3);
}

#[test]
fn revert_all_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open_with_clock(dir.path(), FakeClock::new()).unwrap());
    let journal = Journal::new(store.clone());
    let session_id = SessionId::new();
    let path = dir.path().join("once.txt");
    let path_str = path.to_str().unwrap().to_string();

    let snapshot = journal.capture(session_id, &path_str, SnapshotOp::Create, 1).unwrap();
    std::fs::write(&path, "hi").unwrap();
    journal.record_after(&snapshot.id, Some(b"hi".to_vec())).unwrap();

    journal.revert_all(&session_id).unwrap();
    assert!(!path.exists());

    journal.revert_all(&session_id).unwrap();
    assert!(!path.exists(), "second revert_all call should be a no-op");
}

#[test]
fn accept_all_reapplies_recorded_intent_even_if_touched_out_of_band() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open_with_clock(dir.path(), FakeClock::new()).unwrap());
    let journal = Journal::new(store.clone());
    let session_id = SessionId::new();
    let path = dir.path().join("reapplied.txt");
    let path_str = path.to_str().unwrap().to_string();

    let snapshot = journal.capture(session_id, &path_str, SnapshotOp::Create, 1).unwrap();
    std::fs::write(&path, "original").unwrap();
    journal.record_after(&snapshot.id, Some(b"original".to_vec())).unwrap();

    // simulate an out-of-band edit between capture and acceptance
    std::fs::write(&path, "tampered").unwrap();

    journal.accept_all(&session_id).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
}
