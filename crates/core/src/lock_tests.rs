// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use super::*;
use crate::session::SessionId;
use yare::parameterized;

#[test]
fn live_iff_expiry_in_future() {
    let lock = Lock {
        id: LockId::new(),
        session_id: SessionId::new(),
        path: "/p/a.txt".into(),
        kind: LockKind::Write,
        acquired_at_ms: 1_000,
        expires_at_ms: 2_000,
    };
    assert!(lock.is_live(1_999));
    assert!(!lock.is_live(2_000));
    assert!(!lock.is_live(2_001));
}

#[parameterized(
    package_json = { "/repo/package.json", COMMON_PATH_LOCK_TTL_MS },
    cargo_toml = { "/repo/crates/foo/Cargo.toml", COMMON_PATH_LOCK_TTL_MS },
    readme = { "/repo/README.md", COMMON_PATH_LOCK_TTL_MS },
    regular_source_file = { "/repo/src/main.rs", DEFAULT_LOCK_TTL_MS },
)]
fn ttl_depends_on_basename(path: &str, expected_ms: u64) {
    assert_eq!(lock_ttl_ms_for(path), expected_ms);
}
