// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::*;
use foreman_core::{Message, SessionStatus, SystemClock};
use foreman_engine::model::{FinishReason, ModelError, StreamEvent};
use parking_lot::Mutex as PMutex;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct FakeModelClient {
    events: PMutex<Vec<StreamEvent>>,
}

impl FakeModelClient {
    fn new(events: Vec<StreamEvent>) -> Self {
        Self { events: PMutex::new(events) }
    }
}

#[async_trait::async_trait]
impl ModelClient for FakeModelClient {
    async fn stream(
        &self,
        _messages: &[Message],
        _tools: &[foreman_tools::ToolSchema],
    ) -> Result<mpsc::Receiver<StreamEvent>, ModelError> {
        let events = std::mem::take(&mut *self.events.lock());
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

fn fixture(model: Vec<StreamEvent>) -> (TempDir, TempDir, Arc<SessionManager<SystemClock>>) {
    let store_dir = TempDir::new().unwrap();
    let project_dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open_with_clock(store_dir.path(), SystemClock).unwrap());
    let manager = Arc::new(SessionManager::new_with_clock(
        store,
        Arc::new(FakeModelClient::new(model)),
        SystemClock,
    ));
    (store_dir, project_dir, manager)
}

fn create(manager: &SessionManager<SystemClock>, project: &TempDir) -> Session {
    manager
        .create_agent(CreateAgentRequest {
            name: "agent".to_string(),
            description: None,
            project_path: project.path().to_str().unwrap().to_string(),
            project_name: None,
            workspace_root: None,
            initial_prompt: None,
        })
        .unwrap()
}

#[tokio::test]
async fn create_agent_then_get_agent_round_trips() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let session = create(&manager, &project);
    let fetched = manager.get_agent(&session.id).unwrap();
    assert_eq!(fetched.id, session.id);
    assert_eq!(fetched.status, SessionStatus::Ideas);
}

#[tokio::test]
async fn create_agent_with_initial_prompt_resumes_to_todo() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let session = manager
        .create_agent(CreateAgentRequest {
            name: "agent".to_string(),
            description: None,
            project_path: project.path().to_str().unwrap().to_string(),
            project_name: None,
            workspace_root: None,
            initial_prompt: Some("please start".to_string()),
        })
        .unwrap();
    assert_eq!(session.status, SessionStatus::Todo);
    let messages = manager.get_messages(&session.id, None);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "please start");
}

#[tokio::test]
async fn add_message_from_need_clarification_resumes_to_todo() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let session = create(&manager, &project);
    manager.add_message(session.id, foreman_core::MessageRole::User, "go".to_string()).unwrap();
    manager.update_agent_status(session.id, SessionStatus::Doing).unwrap();
    // Force the session into need_clarification the way the engine would.
    manager.transition(&session.id, SessionStatus::NeedClarification, json!({})).unwrap();

    manager
        .add_message(session.id, foreman_core::MessageRole::User, "here's the clarification".to_string())
        .unwrap();
    let session = manager.get_agent(&session.id).unwrap();
    assert_eq!(session.status, SessionStatus::Todo);
}

#[tokio::test]
async fn add_message_rejects_assistant_role() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let session = create(&manager, &project);
    let err = manager.add_message(session.id, foreman_core::MessageRole::Assistant, "nope".to_string());
    assert!(matches!(err, Err(SessionError::InvalidRole)));
}

#[tokio::test]
async fn update_agent_status_review_to_accepted_accepts_journal_entries() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let session = create(&manager, &project);
    manager.transition(&session.id, SessionStatus::Todo, json!({})).unwrap();
    manager.transition(&session.id, SessionStatus::Doing, json!({})).unwrap();

    let file = project.path().join("out.txt");
    manager
        .journal
        .capture(session.id, file.to_str().unwrap(), foreman_core::SnapshotOp::Create, 1)
        .unwrap();
    let snapshot = manager.journal.list_for_session(&session.id, None).into_iter().next().unwrap();
    manager.journal.record_after(&snapshot.id, Some(b"hello".to_vec())).unwrap();

    manager.transition(&session.id, SessionStatus::Review, json!({})).unwrap();
    manager.update_agent_status(session.id, SessionStatus::Accepted).unwrap();

    assert_eq!(std::fs::read(&file).unwrap(), b"hello");
    let snapshots =
        manager.journal.list_for_session(&session.id, Some(foreman_core::SnapshotStatus::Accepted));
    assert_eq!(snapshots.len(), 1);
}

#[tokio::test]
async fn update_agent_status_review_to_rejected_reverts_journal_entries() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let session = create(&manager, &project);
    let file = project.path().join("out.txt");
    std::fs::write(&file, b"original").unwrap();

    manager.transition(&session.id, SessionStatus::Todo, json!({})).unwrap();
    manager.transition(&session.id, SessionStatus::Doing, json!({})).unwrap();

    manager
        .journal
        .capture(session.id, file.to_str().unwrap(), foreman_core::SnapshotOp::Update, 1)
        .unwrap();
    let snapshot = manager.journal.list_for_session(&session.id, None).into_iter().next().unwrap();
    manager.journal.record_after(&snapshot.id, Some(b"changed".to_vec())).unwrap();
    std::fs::write(&file, b"changed").unwrap();

    manager.transition(&session.id, SessionStatus::Review, json!({})).unwrap();
    manager.update_agent_status(session.id, SessionStatus::Rejected).unwrap();

    assert_eq!(std::fs::read(&file).unwrap(), b"original");
}

#[tokio::test]
async fn start_agent_runs_to_review_and_clears_running_state() {
    let (_store_dir, project, manager) = fixture(vec![StreamEvent::ToolCall {
        id: "call-1".to_string(),
        name: "finishWork".to_string(),
        args: json!({"summary": "done"}),
    }]);
    let session = create(&manager, &project);
    manager.transition(&session.id, SessionStatus::Todo, json!({})).unwrap();

    assert!(manager.start_agent(session.id, None).await.unwrap());
    assert!(manager.is_agent_running(&session.id));

    for _ in 0..50 {
        if !manager.is_agent_running(&session.id) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!manager.is_agent_running(&session.id));
    let session = manager.get_agent(&session.id).unwrap();
    assert_eq!(session.status, SessionStatus::Review);
}

#[tokio::test]
async fn start_agent_twice_while_running_is_rejected() {
    let (_store_dir, project, manager) = fixture(vec![StreamEvent::Finished(FinishReason::Stop)]);
    let session = create(&manager, &project);
    manager.transition(&session.id, SessionStatus::Todo, json!({})).unwrap();
    assert!(manager.start_agent(session.id, None).await.unwrap());
    let err = manager.start_agent(session.id, None).await;
    assert!(matches!(err, Err(SessionError::AlreadyRunning(_))));
}

#[tokio::test]
async fn stop_agent_is_a_noop_when_not_running() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let session = create(&manager, &project);
    manager.stop_agent(session.id, None).unwrap();
    assert!(!manager.is_agent_running(&session.id));
}

#[tokio::test]
async fn delete_agent_removes_the_session() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let session = create(&manager, &project);
    manager.delete_agent(session.id).unwrap();
    assert!(manager.get_agent(&session.id).is_none());
}

#[tokio::test]
async fn list_agents_filters_by_project_and_status() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let a = create(&manager, &project);
    let other_project = TempDir::new().unwrap();
    let _b = create(&manager, &other_project);

    let for_project = manager.list_agents(Some(project.path().to_str().unwrap()), None);
    assert_eq!(for_project.len(), 1);
    assert_eq!(for_project[0].session.id, a.id);

    let by_status = manager.list_agents(None, Some(SessionStatus::Ideas));
    assert_eq!(by_status.len(), 2);
}

#[tokio::test]
async fn get_project_agent_summary_counts_by_status() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let a = create(&manager, &project);
    let _b = create(&manager, &project);
    manager.transition(&a.id, SessionStatus::Todo, json!({})).unwrap();

    let summary = manager.get_project_agent_summary(project.path().to_str().unwrap());
    assert_eq!(summary.total, 2);
    assert_eq!(summary.by_status.get("ideas").copied().unwrap_or(0), 1);
    assert_eq!(summary.by_status.get("todo").copied().unwrap_or(0), 1);
    assert_eq!(summary.running, 0);
}

#[tokio::test]
async fn switch_project_is_read_only_and_lists_other_running_sessions() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let session = create(&manager, &project);
    manager.transition(&session.id, SessionStatus::Todo, json!({})).unwrap();
    manager.transition(&session.id, SessionStatus::Doing, json!({})).unwrap();

    let others = manager.switch_project("/some/other/path");
    assert_eq!(others.len(), 1);
    assert_eq!(others[0].id, session.id);
    // Read-only: status is untouched by the call.
    assert_eq!(manager.get_agent(&session.id).unwrap().status, SessionStatus::Doing);
}

#[tokio::test]
async fn check_file_conflicts_reports_live_locks_held_by_other_sessions() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let a = create(&manager, &project);
    let b = create(&manager, &project);
    let path = project.path().join("shared.txt");
    let path_str = path.to_str().unwrap().to_string();

    let outcome = manager.locks.acquire_write_lock(a.id, &path_str).unwrap();
    assert!(outcome.is_granted());

    let report = manager.check_file_conflicts(b.id, std::slice::from_ref(&path_str));
    assert_eq!(report.conflicts, vec![path_str]);
    assert!(!report.can_proceed);
    assert!(report.suggestions.is_some());
}

#[tokio::test]
async fn cleanup_inactive_projects_deletes_stale_sessions_via_delete_agent() {
    let (_store_dir, project, manager) = fixture(vec![]);
    let session = create(&manager, &project);

    let cutoff = manager.cleanup_inactive_projects(0).unwrap();
    assert_eq!(cutoff, 1);
    assert!(manager.get_agent(&session.id).is_none());
}
