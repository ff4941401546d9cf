// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Model-client implementations for the `foreman` binary.
//!
//! The language-model streaming client is an external collaborator the
//! core design only references by interface — this crate wires up the two
//! stand-ins a standalone CLI binary can actually drive without a network:
//! a client that ends every turn immediately with no tool calls, and a
//! deterministic, script-driven client for demos and the `tests/specs`
//! scenarios, generalized from `FakeModelClient` in `foreman-engine`'s own
//! runner tests into something a JSON file on disk can parameterize.

use async_trait::async_trait;
use foreman_core::Message;
use foreman_engine::{FinishReason, ModelClient, ModelError, StreamEvent};
use foreman_tools::ToolSchema;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// A model client that never calls a tool: every turn ends at `Stop`
/// immediately. Lets `start`/`stop` exercise the lifecycle without a real
/// model wired in; a session run against it simply stays `doing` under the
/// "model did not call finishWork" rule until a caller stops it.
pub struct NoopModelClient;

#[async_trait]
impl ModelClient for NoopModelClient {
    async fn stream(
        &self,
        _messages: &[Message],
        _tools: &[ToolSchema],
    ) -> Result<mpsc::Receiver<StreamEvent>, ModelError> {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(StreamEvent::Finished(FinishReason::Stop)).await;
        Ok(rx)
    }
}

/// One scripted turn: assistant text followed by zero or more tool calls,
/// then a finish reason. Deserialized from the JSON array at
/// `--model-script <path>`.
#[derive(Debug, Clone, Deserialize)]
struct ScriptedTurn {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ScriptedToolCall>,
    #[serde(default = "default_finish")]
    finish: String,
    #[serde(default)]
    finish_detail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptedToolCall {
    id: String,
    name: String,
    #[serde(default)]
    args: Value,
}

fn default_finish() -> String {
    "stop".to_string()
}

fn parse_finish(reason: &str, detail: Option<String>) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "tool_use" => FinishReason::ToolUse,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        "aborted" => FinishReason::Aborted,
        other => FinishReason::Error(detail.unwrap_or_else(|| other.to_string())),
    }
}

/// Replays a fixed sequence of turns read from a JSON scenario file,
/// advancing one turn per call to `stream`. Exhausting the script ends
/// every subsequent turn at `Stop` with no tool calls, so a scenario only
/// needs to script as many turns as it cares about.
pub struct ScriptedModelClient {
    turns: Mutex<std::collections::VecDeque<ScriptedTurn>>,
}

impl ScriptedModelClient {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading model script {}: {e}", path.display()))?;
        let turns: Vec<ScriptedTurn> = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing model script {}: {e}", path.display()))?;
        Ok(Self { turns: Mutex::new(turns.into()) })
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn stream(
        &self,
        _messages: &[Message],
        _tools: &[ToolSchema],
    ) -> Result<mpsc::Receiver<StreamEvent>, ModelError> {
        let turn = self.turns.lock().pop_front();
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let Some(turn) = turn else {
                let _ = tx.send(StreamEvent::Finished(FinishReason::Stop)).await;
                return;
            };
            if let Some(text) = turn.text {
                if tx.send(StreamEvent::AssistantText(text)).await.is_err() {
                    return;
                }
            }
            for call in turn.tool_calls {
                let event = StreamEvent::ToolCall { id: call.id, name: call.name, args: call.args };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            let finish = parse_finish(&turn.finish, turn.finish_detail);
            let _ = tx.send(StreamEvent::Finished(finish)).await;
        });
        Ok(rx)
    }
}
