// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::MaterializedState;
use foreman_core::{Message, MessageId};
use serde_json::Value;

pub fn apply_added(state: &mut MaterializedState, message: &Message) {
    state.messages.entry(message.id).or_insert_with(|| message.clone());
}

pub fn apply_result_updated(state: &mut MaterializedState, message_id: &MessageId, tool_result: &Value) {
    if let Some(message) = state.messages.get_mut(message_id) {
        message.tool_result = Some(tool_result.clone());
    }
}
