// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-session: the Session Manager facade and Event Bus.
//!
//! This is the crate a front-end transport or CLI is expected to sit on
//! top of: every public command is a method here, each one wrapping the
//! state-machine validator shared with `foreman-engine` over
//! `foreman-storage`'s CRUD surface, and fanning events out on the topic
//! registry in [`bus`].

pub mod bus;
pub mod error;
pub mod manager;

pub use bus::{Disposer, EventBus};
pub use error::{SessionError, SessionResult};
pub use manager::{
    CreateAgentRequest, FileConflictReport, ProgressSummary, ProjectAgentSummary, SessionManager,
    SessionSummary, StartAgentOptions,
};
pub use foreman_storage::ProjectSummary;
