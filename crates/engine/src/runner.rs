// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `SessionRunner`: drives one session through a single model turn,
//! dispatching any tool calls the model makes along the way, with a timed
//! dispatch-and-log wrapper around each effect.

use crate::model::{FinishReason, ModelClient, StreamEvent};
use crate::{EngineResult, DEFAULT_MAX_STEPS};
use foreman_core::{Clock, Event, EventPublisher, MessageRole, ProgressStatus, SessionId};
use foreman_storage::Store;
use foreman_tools::{TerminalSignal, ToolContext, ToolOutcome, ToolSurface};
use serde_json::{json, Value};
use std::sync::Arc;

/// Outcome of one call to [`SessionRunner::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The model called `finishWork`; the session is ready for human
    /// review.
    Review { summary: String, changes: Option<Value>, notes: Option<String> },
    /// The model called `requireClarification`, hit a lock conflict, threw
    /// an uncaught tool error, ended its stream with a non-`Stop` reason,
    /// or exceeded the step cap. The session awaits a new user message.
    NeedClarification { reason: String, metadata: Value },
    /// The model's stream ended with `Stop` and no terminal tool call.
    /// This alone does not transition the session; the caller may choose
    /// to run another turn or leave it as-is.
    Continue,
}

/// Drives a single session's `doing` work: one model turn, with any tool
/// calls dispatched through [`ToolSurface`] as they arrive.
pub struct SessionRunner<C: Clock = foreman_core::SystemClock> {
    store: Arc<Store<C>>,
    tools: Arc<ToolSurface<C>>,
    max_steps: u64,
    publisher: Option<EventPublisher>,
}

/// Effect of handling a single tool call within a turn.
enum ToolCallEffect {
    Continue,
    Terminal(TerminalSignal),
    NeedClarification(String),
}

impl<C: Clock> SessionRunner<C> {
    pub fn new(store: Arc<Store<C>>, tools: Arc<ToolSurface<C>>) -> Self {
        Self { store, tools, max_steps: DEFAULT_MAX_STEPS, publisher: None }
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Notifications for `Event::Step*`/`Event::Execution*` are bus-only
    /// (see `foreman_core::event`'s doc comment: they carry no state
    /// mutation and `MaterializedState::apply_event` no-ops them) so they
    /// are published here directly rather than persisted through `Store`,
    /// which exposes no method to append them. The durable record of a
    /// session's execution history is its `ProgressEntry` log.
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    fn publish(&self, event: Event) {
        if let Some(publisher) = &self.publisher {
            publisher(&event);
        }
    }

    /// Run a single turn: one model stream, zero or more tool calls, ending
    /// at a terminal signal, a need-clarification condition, or a plain
    /// `Stop`. Does not itself update `Session.status` — the caller (the
    /// [`crate::Supervisor`], or `foreman-session`'s own dispatch path)
    /// performs that transition via `foreman_core::validate_transition`,
    /// the same table used for user-driven transitions.
    pub async fn run(
        &self,
        session_id: SessionId,
        project_path: &str,
        model: &dyn ModelClient,
    ) -> EngineResult<StepOutcome> {
        let step_index = self.store.get_messages(&session_id, None).len() as u64 + 1;
        if step_index > self.max_steps {
            self.store.add_progress(
                session_id,
                "maxSteps".to_string(),
                ProgressStatus::Failed,
                Some(format!("reached step cap of {}", self.max_steps)),
            )?;
            return Ok(StepOutcome::NeedClarification {
                reason: "max_steps_exceeded".to_string(),
                metadata: json!({"maxSteps": self.max_steps}),
            });
        }

        self.publish(Event::StepStarted { session_id, step_index });
        // Tool-result payloads are re-derived from the model's own tool-call
        // state as it runs, so they're dropped from what gets replayed back
        // to it; only the call itself (if any) stays visible.
        let history: Vec<_> =
            self.store.get_messages(&session_id, None).into_iter().filter(|m| m.tool_result.is_none()).collect();
        let catalogue = foreman_tools::catalogue();
        let mut stream = model.stream(&history, &catalogue).await?;

        let mut finish_reason = None;
        while let Some(event) = stream.recv().await {
            match event {
                StreamEvent::AssistantText(text) => {
                    self.store.add_message(session_id, MessageRole::Assistant, text, None, step_index)?;
                }
                StreamEvent::ToolCall { id, name, args } => {
                    match self.handle_tool_call(session_id, project_path, step_index, &id, &name, &args) {
                        Ok(ToolCallEffect::Continue) => {}
                        Ok(ToolCallEffect::Terminal(signal)) => {
                            self.publish(Event::StepCompleted { session_id, step_index });
                            return Ok(terminal_outcome(signal));
                        }
                        Ok(ToolCallEffect::NeedClarification(reason)) => {
                            self.publish(Event::StepCompleted { session_id, step_index });
                            return Ok(StepOutcome::NeedClarification {
                                metadata: json!({"reason": reason}),
                                reason,
                            });
                        }
                        Err(e) => {
                            self.publish(Event::StepFailed { session_id, step_index, reason: e.to_string() });
                            self.store.add_progress(
                                session_id,
                                name.clone(),
                                ProgressStatus::Failed,
                                Some(e.to_string()),
                            )?;
                            return Ok(StepOutcome::NeedClarification {
                                metadata: json!({"tool": name, "error": e.to_string()}),
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                StreamEvent::Finished(reason) => {
                    finish_reason = Some(reason);
                    break;
                }
            }
        }
        self.publish(Event::StepCompleted { session_id, step_index });

        match finish_reason {
            Some(FinishReason::Stop) | None => {
                self.store.add_progress(
                    session_id,
                    "modelTurn".to_string(),
                    ProgressStatus::Completed,
                    Some("stream ended with stop and no finishWork call".to_string()),
                )?;
                Ok(StepOutcome::Continue)
            }
            Some(other) => {
                let reason = format!("{other:?}");
                self.store.add_progress(
                    session_id,
                    "modelTurn".to_string(),
                    ProgressStatus::Failed,
                    Some(reason.clone()),
                )?;
                Ok(StepOutcome::NeedClarification { metadata: json!({"finishReason": reason}), reason })
            }
        }
    }

    fn handle_tool_call(
        &self,
        session_id: SessionId,
        project_path: &str,
        step_index: u64,
        call_id: &str,
        name: &str,
        args: &Value,
    ) -> EngineResult<ToolCallEffect> {
        self.store.add_message(
            session_id,
            MessageRole::Tool,
            String::new(),
            Some(json!({"id": call_id, "name": name, "args": args})),
            step_index,
        )?;
        let ctx = ToolContext { session_id, project_path, step_index };
        let outcome = self.tools.dispatch(&ctx, name, args)?;
        match outcome {
            ToolOutcome::Value(result) => {
                if let Some(message) = self.store.find_message_by_tool_call_id(&session_id, call_id) {
                    self.store.update_message_result(&message.id, result.clone())?;
                }
                if result.get("ok").and_then(Value::as_bool) == Some(false) {
                    if let Some(conflicting) = result.get("conflictingSession").and_then(Value::as_str) {
                        let path = args.get("path").and_then(Value::as_str).unwrap_or_default().to_string();
                        self.publish(Event::LockConflict {
                            session_id,
                            path,
                            conflicting_session_id: foreman_core::SessionId::from_string(conflicting),
                        });
                        return Ok(ToolCallEffect::NeedClarification("lock conflict".to_string()));
                    }
                }
                Ok(ToolCallEffect::Continue)
            }
            ToolOutcome::Terminal(signal) => Ok(ToolCallEffect::Terminal(signal)),
        }
    }
}

fn terminal_outcome(signal: TerminalSignal) -> StepOutcome {
    match signal {
        TerminalSignal::FinishWork { summary, changes, notes } => {
            StepOutcome::Review { summary, changes, notes }
        }
        TerminalSignal::RequireClarification { question, context, suggestions } => {
            let metadata = json!({"question": question, "context": context, "suggestions": suggestions});
            StepOutcome::NeedClarification { reason: question, metadata }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
