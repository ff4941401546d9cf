// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::*;
use yare::parameterized;

#[parameterized(
    user = { MessageRole::User, "user" },
    assistant = { MessageRole::Assistant, "assistant" },
    system = { MessageRole::System, "system" },
    tool = { MessageRole::Tool, "tool" },
)]
fn role_serializes_snake_case(role: MessageRole, expected: &str) {
    let json = serde_json::to_string(&role).unwrap();
    assert_eq!(json, format!("\"{expected}\""));
}

#[test]
fn builder_has_no_tool_payloads_by_default() {
    let message = Message::builder().content("hello").build();
    assert_eq!(message.content, "hello");
    assert!(message.tool_call.is_none());
    assert!(message.tool_result.is_none());
}

#[test]
fn tool_result_can_be_attached_after_construction() {
    let mut message = Message::builder()
        .role(MessageRole::Tool)
        .tool_call(serde_json::json!({"name": "readFile"}))
        .build();
    assert!(message.tool_result.is_none());
    message.tool_result = Some(serde_json::json!({"ok": true}));
    assert!(message.tool_result.is_some());
}
