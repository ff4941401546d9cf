// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-engine: the Execution Engine. Drives a session's model-turn /
//! tool-call loop to a terminal outcome, bounds how many sessions may run
//! concurrently, and reconciles state left behind by an unclean shutdown.

pub mod model;
pub mod reconcile;
pub mod runner;
pub mod supervisor;

pub use model::{FinishReason, ModelClient, ModelError, StreamEvent};
pub use reconcile::reconcile_doing_sessions;
pub use runner::{SessionRunner, StepOutcome};
pub use supervisor::Supervisor;

use thiserror::Error;

/// Default bound on how many sessions may be `doing` at once.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default cap on model turns per session before forcing clarification.
pub const DEFAULT_MAX_STEPS: u64 = 50;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("tool error: {0}")]
    Tool(#[from] foreman_tools::ToolError),
    #[error("storage error: {0}")]
    Storage(#[from] foreman_storage::StorageError),
    #[error("core error: {0}")]
    Core(#[from] foreman_core::CoreError),
    #[error("model error: {0}")]
    Model(#[from] model::ModelError),
    #[error("worker pool is closed")]
    PoolClosed,
}

pub type EngineResult<T> = Result<T, EngineError>;
