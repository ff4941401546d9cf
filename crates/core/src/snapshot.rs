// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Snapshot: a journal entry capturing enough bytes to undo or reapply one
//! file mutation. Not to be confused with `foreman-storage`'s own
//! persistence-store snapshot (a checkpoint of the whole materialized state).

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a file-mutation snapshot.
    pub struct SnapshotId("snp-");
}

/// The filesystem operation a snapshot journals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOp {
    Create,
    Update,
    Delete,
}

crate::simple_display! {
    SnapshotOp {
        Create => "create",
        Update => "update",
        Delete => "delete",
    }
}

/// Disposition of a journalled mutation: pending until the session reaches
/// a terminal review outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    Pending,
    Accepted,
    Reverted,
}

crate::simple_display! {
    SnapshotStatus {
        Pending => "pending",
        Accepted => "accepted",
        Reverted => "reverted",
    }
}

/// One journalled file mutation.
///
/// For `update`/`delete`, `before_content` is the exact bytes read
/// immediately before the operation. For `create`/`update`, `after_content`
/// is the exact bytes written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub session_id: SessionId,
    pub path: String,
    pub op: SnapshotOp,
    #[serde(default, with = "serde_bytes_opt")]
    pub before_content: Option<Vec<u8>>,
    #[serde(default, with = "serde_bytes_opt")]
    pub after_content: Option<Vec<u8>>,
    pub status: SnapshotStatus,
    pub step_index: u64,
    pub timestamp_ms: u64,
}

/// `serde_json` has no native bytes type; store as base64 strings so the
/// WAL and checkpoint remain plain JSON while keeping arbitrary byte content
/// (non-utf8 files) intact.
mod serde_bytes_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        use base64::Engine as _;
        v.as_ref()
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        use base64::Engine as _;
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|s| {
                base64::engine::general_purpose::STANDARD
                    .decode(s)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct SnapshotBuilder => Snapshot {
        into {
            id: SnapshotId = SnapshotId::new(),
            path: String = "/tmp/project/file.txt",
        }
        set {
            session_id: SessionId = SessionId::new(),
            op: SnapshotOp = SnapshotOp::Create,
            status: SnapshotStatus = SnapshotStatus::Pending,
            step_index: u64 = 0,
            timestamp_ms: u64 = 0,
        }
        option {
            before_content: Vec<u8> = None,
            after_content: Vec<u8> = None,
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
