// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Message: one turn of a session's conversation with the model.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    /// Unique identifier for a message.
    pub struct MessageId("msg-");
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

crate::simple_display! {
    MessageRole {
        User => "user",
        Assistant => "assistant",
        System => "system",
        Tool => "tool",
    }
}

/// A single message in a session's conversation.
///
/// Tool-call and tool-result payloads are stored schemaless; typed
/// deserialisation happens only at the tool dispatch boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub tool_call: Option<Value>,
    #[serde(default)]
    pub tool_result: Option<Value>,
    /// Monotone within a session; orders messages alongside `timestamp_ms`.
    pub step_index: u64,
    pub timestamp_ms: u64,
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct MessageBuilder => Message {
        into {
            id: MessageId = MessageId::new(),
            content: String = "",
        }
        set {
            session_id: SessionId = SessionId::new(),
            role: MessageRole = MessageRole::User,
            step_index: u64 = 0,
            timestamp_ms: u64 = 0,
        }
        option {
            tool_call: Value = None,
            tool_result: Value = None,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
