// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-core: shared domain types for the agent orchestration core —
//! sessions, messages, progress entries, locks, snapshots, and the event
//! vocabulary that threads them through the write-ahead log and event bus.

pub mod macros;

pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod lock;
pub mod message;
pub mod progress;
pub mod session;
pub mod snapshot;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use event::{Event, EventPublisher, Topic};
pub use id::short;
pub use lock::{lock_ttl_ms_for, Lock, LockId, LockKind, COMMON_PATH_BASENAMES, DEFAULT_LOCK_TTL_MS};
pub use message::{Message, MessageId, MessageRole};
pub use progress::{ProgressEntry, ProgressEntryId, ProgressStatus};
pub use session::{validate_transition, Session, SessionId, SessionStatus};
pub use snapshot::{Snapshot, SnapshotId, SnapshotOp, SnapshotStatus};

#[cfg(any(test, feature = "test-support"))]
pub use message::MessageBuilder;
#[cfg(any(test, feature = "test-support"))]
pub use progress::ProgressEntryBuilder;
#[cfg(any(test, feature = "test-support"))]
pub use session::SessionBuilder;
#[cfg(any(test, feature = "test-support"))]
pub use snapshot::SnapshotBuilder;
