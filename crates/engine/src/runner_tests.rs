// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::*;
use foreman_core::{Message, SessionId, SystemClock};
use foreman_journal::Journal;
use foreman_locks::LockArbiter;
use foreman_tools::ToolSchema;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct FakeModelClient {
    events: Mutex<Vec<StreamEvent>>,
}

impl FakeModelClient {
    fn new(events: Vec<StreamEvent>) -> Self {
        Self { events: Mutex::new(events) }
    }
}

#[async_trait::async_trait]
impl ModelClient for FakeModelClient {
    async fn stream(
        &self,
        _messages: &[Message],
        _tools: &[ToolSchema],
    ) -> Result<mpsc::Receiver<StreamEvent>, crate::model::ModelError> {
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

fn fixture() -> (TempDir, TempDir, Arc<Store<SystemClock>>, SessionRunner) {
    let store_dir = TempDir::new().unwrap();
    let project_dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(store_dir.path()).unwrap());
    let locks = Arc::new(LockArbiter::new(store.clone(), SystemClock));
    let journal = Arc::new(Journal::new(store.clone()));
    let tools = Arc::new(ToolSurface::new(store.clone(), locks, journal));
    (store_dir, project_dir, store.clone(), SessionRunner::new(store, tools))
}

#[tokio::test]
async fn finish_work_tool_call_returns_review_outcome() {
    let (_store_dir, project, _store, runner) = fixture();
    let session_id = SessionId::new();
    let model = FakeModelClient::new(vec![StreamEvent::ToolCall {
        id: "call-1".to_string(),
        name: "finishWork".to_string(),
        args: json!({"summary": "did the thing"}),
    }]);

    let outcome = runner.run(session_id, project.path().to_str().unwrap(), &model).await.unwrap();
    match outcome {
        StepOutcome::Review { summary, .. } => assert_eq!(summary, "did the thing"),
        other => panic!("expected Review outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn require_clarification_tool_call_returns_need_clarification() {
    let (_store_dir, project, _store, runner) = fixture();
    let session_id = SessionId::new();
    let model = FakeModelClient::new(vec![StreamEvent::ToolCall {
        id: "call-1".to_string(),
        name: "requireClarification".to_string(),
        args: json!({"question": "which branch?"}),
    }]);

    let outcome = runner.run(session_id, project.path().to_str().unwrap(), &model).await.unwrap();
    match outcome {
        StepOutcome::NeedClarification { reason, .. } => assert_eq!(reason, "which branch?"),
        other => panic!("expected NeedClarification outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn lock_conflict_returns_need_clarification() {
    let (_store_dir, project, store, runner) = fixture();
    let session_a = SessionId::new();
    let session_b = SessionId::new();
    let path = project.path().join("shared.txt");
    let path_str = path.to_str().unwrap().to_string();

    // A second arbiter over the same store sees and holds the same lock
    // table the runner's own tool surface dispatches against.
    let holder_locks = LockArbiter::new(store, SystemClock);
    let held = holder_locks.acquire_write_lock(session_b, &path_str).unwrap();
    assert!(held.is_granted());

    let model = FakeModelClient::new(vec![StreamEvent::ToolCall {
        id: "call-1".to_string(),
        name: "writeFile".to_string(),
        args: json!({"path": path_str, "content": "x"}),
    }]);

    let outcome = runner.run(session_a, project.path().to_str().unwrap(), &model).await.unwrap();
    match outcome {
        StepOutcome::NeedClarification { reason, .. } => assert_eq!(reason, "lock conflict"),
        other => panic!("expected NeedClarification outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_finished_stop_without_finish_work_returns_continue() {
    let (_store_dir, project, _store, runner) = fixture();
    let session_id = SessionId::new();
    let model = FakeModelClient::new(vec![
        StreamEvent::AssistantText("thinking...".to_string()),
        StreamEvent::Finished(FinishReason::Stop),
    ]);

    let outcome = runner.run(session_id, project.path().to_str().unwrap(), &model).await.unwrap();
    assert_eq!(outcome, StepOutcome::Continue);
}

#[tokio::test]
async fn stream_finished_with_error_reason_returns_need_clarification() {
    let (_store_dir, project, _store, runner) = fixture();
    let session_id = SessionId::new();
    let model = FakeModelClient::new(vec![StreamEvent::Finished(FinishReason::Error(
        "provider timeout".to_string(),
    ))]);

    let outcome = runner.run(session_id, project.path().to_str().unwrap(), &model).await.unwrap();
    assert!(matches!(outcome, StepOutcome::NeedClarification { .. }));
}

#[tokio::test]
async fn unknown_tool_call_returns_need_clarification_with_tool_error() {
    let (_store_dir, project, _store, runner) = fixture();
    let session_id = SessionId::new();
    let model = FakeModelClient::new(vec![StreamEvent::ToolCall {
        id: "call-1".to_string(),
        name: "teleport".to_string(),
        args: json!({}),
    }]);

    let outcome = runner.run(session_id, project.path().to_str().unwrap(), &model).await.unwrap();
    match outcome {
        StepOutcome::NeedClarification { metadata, .. } => {
            assert_eq!(metadata["tool"], json!("teleport"));
        }
        other => panic!("expected NeedClarification outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn max_steps_cap_short_circuits_before_any_model_call() {
    let (_store_dir, project, _store, runner) = fixture();
    let runner = runner.with_max_steps(0);
    let session_id = SessionId::new();
    let model = FakeModelClient::new(vec![StreamEvent::Finished(FinishReason::Stop)]);

    let outcome = runner.run(session_id, project.path().to_str().unwrap(), &model).await.unwrap();
    match outcome {
        StepOutcome::NeedClarification { reason, .. } => assert_eq!(reason, "max_steps_exceeded"),
        other => panic!("expected NeedClarification outcome, got {other:?}"),
    }
}
