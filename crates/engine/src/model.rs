// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `ModelClient`: the external model-streaming collaborator boundary the
//! engine drives one turn at a time. Channel-based rather than
//! `Stream`-based since the workspace has no `futures` dependency —
//! `tokio::sync::mpsc` carries the event plumbing instead.

use async_trait::async_trait;
use foreman_core::Message;
use foreman_tools::ToolSchema;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// One chunk of a model's streamed response for a single turn.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A chunk of assistant-authored text, recorded as its own message.
    AssistantText(String),
    /// A tool invocation the model is requesting.
    ToolCall { id: String, name: String, args: Value },
    /// The stream is done; no further events follow.
    Finished(FinishReason),
}

/// Why a model's turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// The model is done producing output for this turn and issued no
    /// tool calls; this alone does not transition the session — it is
    /// expected to have called `finishWork` instead.
    Stop,
    /// The model issued one or more tool calls; results were already
    /// consumed as `ToolCall` events earlier in the stream.
    ToolUse,
    /// Truncated by a token or length limit.
    Length,
    /// Blocked by the model provider's content filter.
    ContentFilter,
    /// The turn was cancelled before the model finished.
    Aborted,
    /// Any other provider-reported failure, carried verbatim for the
    /// resulting `need_clarification` metadata.
    Error(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model stream error: {0}")]
    Stream(String),
}

/// The streaming model boundary: accepts a message history and the tool
/// catalogue, returns a channel of stream events for one turn.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<mpsc::Receiver<StreamEvent>, ModelError>;
}
