//! End-to-end lifecycle scenarios, driven entirely through the `foreman`
//! binary against a scripted model client.

use crate::prelude::*;
use serde_json::Value;

fn created_id(output: &Output) -> String {
    let value: Value = serde_json::from_str(&output.stdout()).expect("valid json");
    value["id"].as_str().expect("id field").to_string()
}

/// Happy path: model writes a file then calls `finishWork`; the session
/// lands in `review` with a pending `create` snapshot, and accepting it
/// leaves the written bytes on disk.
#[test]
fn happy_path_write_then_accept() {
    let temp = Project::empty();
    let script = temp.model_script(
        r#"[
        {
            "tool_calls": [
                {"id": "1", "name": "writeFile", "args": {"path": "a.txt", "content": "hi"}},
                {"id": "2", "name": "finishWork", "args": {"summary": "done"}}
            ],
            "finish": "tool_use"
        }
    ]"#,
    );

    let created = temp
        .foreman()
        .args(["--format", "json", "agent", "create", "writer", "--project", temp.path().to_str().unwrap()])
        .passes();
    let id = created_id(&created);

    temp.foreman()
        .args(["agent", "start", &id, "--model-script", script.to_str().unwrap()])
        .passes()
        .stdout_has("review");

    assert_eq!(temp.read("a.txt").as_deref(), Some("hi"));

    temp.foreman().args(["agent", "status", &id, "accepted"]).passes();
    assert_eq!(temp.read("a.txt").as_deref(), Some("hi"), "acceptAll re-applies the recorded intent");

    let get = temp.foreman().args(["--format", "json", "agent", "get", &id]).passes();
    let session: Value = serde_json::from_str(&get.stdout()).unwrap();
    assert_eq!(session["status"], "accepted");
}

/// Same happy path up to review, but rejecting reverts the write.
#[test]
fn reject_path_reverts_write() {
    let temp = Project::empty();
    let script = temp.model_script(
        r#"[
        {
            "tool_calls": [
                {"id": "1", "name": "writeFile", "args": {"path": "a.txt", "content": "hi"}},
                {"id": "2", "name": "finishWork", "args": {"summary": "done"}}
            ],
            "finish": "tool_use"
        }
    ]"#,
    );

    let created = temp
        .foreman()
        .args(["--format", "json", "agent", "create", "writer", "--project", temp.path().to_str().unwrap()])
        .passes();
    let id = created_id(&created);

    temp.foreman().args(["agent", "start", &id, "--model-script", script.to_str().unwrap()]).passes();
    assert!(temp.exists("a.txt"));

    temp.foreman().args(["agent", "status", &id, "rejected"]).passes();
    assert!(!temp.exists("a.txt"), "revertAll should unlink the created file");
}

/// A model reading outside the project boundary gets an in-band error;
/// no lock, no snapshot, no transition, and the agent keeps going.
#[test]
fn out_of_bounds_read_is_in_band_and_non_fatal() {
    let temp = Project::empty();
    let script = temp.model_script(
        r#"[
        {
            "tool_calls": [
                {"id": "1", "name": "readFile", "args": {"path": "/etc/passwd"}},
                {"id": "2", "name": "finishWork", "args": {"summary": "looked, bailed"}}
            ],
            "finish": "tool_use"
        }
    ]"#,
    );

    let created = temp
        .foreman()
        .args(["--format", "json", "agent", "create", "reader", "--project", temp.path().to_str().unwrap()])
        .passes();
    let id = created_id(&created);

    temp.foreman()
        .args(["agent", "start", &id, "--model-script", script.to_str().unwrap()])
        .passes()
        .stdout_has("review");

    let messages = temp.foreman().args(["--format", "json", "agent", "messages", &id]).passes();
    assert!(messages.stdout().contains("outside project bounds"));
}

/// Clarification cycle: `requireClarification` parks the agent, a user
/// message resumes it to `todo`, and it can be started again.
#[test]
fn clarification_cycle_resumes_on_user_message() {
    let temp = Project::empty();
    let script = temp.model_script(
        r#"[
        {
            "tool_calls": [
                {"id": "1", "name": "requireClarification", "args": {"question": "which port?"}}
            ],
            "finish": "tool_use"
        }
    ]"#,
    );

    let created = temp
        .foreman()
        .args(["--format", "json", "agent", "create", "asker", "--project", temp.path().to_str().unwrap()])
        .passes();
    let id = created_id(&created);

    temp.foreman()
        .args(["agent", "start", &id, "--model-script", script.to_str().unwrap()])
        .passes()
        .stdout_has("need_clarification");

    temp.foreman().args(["agent", "message", &id, "user", "3000"]).passes();

    let get = temp.foreman().args(["--format", "json", "agent", "get", &id]).passes();
    let session: Value = serde_json::from_str(&get.stdout()).unwrap();
    assert_eq!(session["status"], "todo");
}
