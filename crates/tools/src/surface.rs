// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Tool dispatch: one `(sessionId, args) -> result` call per invocation,
//! side effects mediated by [`foreman_locks::LockArbiter`] and
//! [`foreman_journal::Journal`], with a timed dispatch-and-log wrapper
//! around the inner per-tool match.

use crate::ignore::{is_ignored, load_ignore_patterns};
use crate::{ToolError, ToolResult};
use foreman_core::{Clock, ProgressStatus, SessionId, SnapshotOp};
use foreman_journal::Journal;
use foreman_locks::{LockArbiter, LockOutcome};
use foreman_storage::Store;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Manifest basenames `getProjectInfo` recognizes as a project config file.
const MANIFEST_WHITELIST: &[&str] = &[
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "composer.json",
    "Gemfile",
];

/// The fixed context a tool call runs under: which session, which project
/// root it is bounded to, and which execution step captured snapshots
/// should be attributed to.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub session_id: SessionId,
    pub project_path: &'a str,
    pub step_index: u64,
}

/// Signal produced by a terminal tool (`finishWork`/`requireClarification`).
///
/// `foreman-tools` deliberately stops here instead of calling into
/// `foreman-session` to perform the status transition itself — doing so
/// would make `foreman-tools` depend on `foreman-session`, which already
/// depends on `foreman-engine`, which depends on `foreman-tools`. The
/// caller (`foreman-engine`) performs the transition against the same
/// `foreman_core::validate_transition` table `foreman-session` uses for
/// user-driven transitions, so both layers share one source of truth
/// instead of `foreman-tools` calling `foreman-session` directly.
#[derive(Debug, Clone)]
pub enum TerminalSignal {
    FinishWork { summary: String, changes: Option<Value>, notes: Option<String> },
    RequireClarification { question: String, context: Option<Value>, suggestions: Option<Value> },
}

/// Result of dispatching one tool call.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// The tool's JSON-shaped response, including in-band failures such as
    /// `{ok: false, error: "outside project bounds"}` or a lock conflict.
    Value(Value),
    Terminal(TerminalSignal),
}

pub struct ToolSurface<C: Clock = foreman_core::SystemClock> {
    store: Arc<Store<C>>,
    locks: Arc<LockArbiter<C>>,
    journal: Arc<Journal<C>>,
}

impl<C: Clock> ToolSurface<C> {
    pub fn new(store: Arc<Store<C>>, locks: Arc<LockArbiter<C>>, journal: Arc<Journal<C>>) -> Self {
        Self { store, locks, journal }
    }

    /// Dispatch one named tool call, timing and logging the way
    /// `Executor::execute` logs every effect. A `running` progress entry is
    /// appended before the call and a `completed`/`failed` entry after,
    /// for every tool, terminal or not.
    pub fn dispatch(&self, ctx: &ToolContext<'_>, name: &str, args: &Value) -> ToolResult<ToolOutcome> {
        self.store.add_progress(ctx.session_id, name.to_string(), ProgressStatus::Running, None)?;
        let start = std::time::Instant::now();
        let result = self.dispatch_inner(ctx, name, args);
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => {
                tracing::info!(tool = name, session_id = %ctx.session_id, elapsed_ms, "tool dispatched");
                let (status, details) = progress_outcome(outcome);
                self.store.add_progress(ctx.session_id, name.to_string(), status, details)?;
            }
            Err(e) => {
                tracing::warn!(tool = name, session_id = %ctx.session_id, elapsed_ms, error = %e, "tool failed");
                self.store.add_progress(
                    ctx.session_id,
                    name.to_string(),
                    ProgressStatus::Failed,
                    Some(e.to_string()),
                )?;
            }
        }
        result
    }

    fn dispatch_inner(&self, ctx: &ToolContext<'_>, name: &str, args: &Value) -> ToolResult<ToolOutcome> {
        match name {
            "readFile" => self.read_file(ctx, args).map(ToolOutcome::Value),
            "writeFile" => self.write_file(ctx, args).map(ToolOutcome::Value),
            "deleteFile" => self.delete_file(ctx, args).map(ToolOutcome::Value),
            "listDirectory" => self.list_directory(ctx, args).map(ToolOutcome::Value),
            "createDirectory" => self.create_directory(ctx, args).map(ToolOutcome::Value),
            "searchFiles" => self.search_files(ctx, args).map(ToolOutcome::Value),
            "getProjectInfo" => self.get_project_info(ctx, args).map(ToolOutcome::Value),
            "finishWork" => self.finish_work(ctx, args).map(ToolOutcome::Terminal),
            "requireClarification" => self.require_clarification(ctx, args).map(ToolOutcome::Terminal),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Resolve `path` against the project root and check containment.
    /// Returns the in-band `{ok: false, ...}` value directly (not an
    /// `Err`) when the path escapes the project: no lock, no snapshot, no
    /// transition; the agent continues.
    fn resolve(&self, ctx: &ToolContext<'_>, path: &str) -> Result<PathBuf, Value> {
        let root = normalize(Path::new(ctx.project_path));
        let candidate =
            if Path::new(path).is_absolute() { PathBuf::from(path) } else { root.join(path) };
        let normalized = normalize(&candidate);
        if normalized.starts_with(&root) {
            Ok(normalized)
        } else {
            Err(json!({"ok": false, "error": "outside project bounds"}))
        }
    }

    fn read_file(&self, ctx: &ToolContext<'_>, args: &Value) -> ToolResult<Value> {
        let path = str_arg(args, "path")?;
        let target = match self.resolve(ctx, &path) {
            Ok(p) => p,
            Err(v) => return Ok(v),
        };
        let path_str = target.to_string_lossy().into_owned();
        match self.locks.acquire_read_lock(ctx.session_id, &path_str)? {
            LockOutcome::Conflict { conflicting_session, .. } => {
                Ok(json!({"ok": false, "conflictingSession": conflicting_session}))
            }
            LockOutcome::Granted(lock) => {
                let result = std::fs::read_to_string(&target)
                    .map(|content| json!({"ok": true, "content": content}))
                    .map_err(|e| io_err(&path_str, e));
                self.locks.release(&lock.id, &ctx.session_id)?;
                result
            }
        }
    }

    fn write_file(&self, ctx: &ToolContext<'_>, args: &Value) -> ToolResult<Value> {
        let path = str_arg(args, "path")?;
        let content = str_arg(args, "content")?;
        let target = match self.resolve(ctx, &path) {
            Ok(p) => p,
            Err(v) => return Ok(v),
        };
        let path_str = target.to_string_lossy().into_owned();
        match self.locks.acquire_write_lock(ctx.session_id, &path_str)? {
            LockOutcome::Conflict { conflicting_session, .. } => {
                Ok(json!({"ok": false, "conflictingSession": conflicting_session}))
            }
            LockOutcome::Granted(lock) => {
                let result = self.write_file_locked(ctx, &target, &path_str, &content);
                self.locks.release(&lock.id, &ctx.session_id)?;
                result
            }
        }
    }

    fn write_file_locked(
        &self,
        ctx: &ToolContext<'_>,
        target: &Path,
        path_str: &str,
        content: &str,
    ) -> ToolResult<Value> {
        let op = if target.exists() { SnapshotOp::Update } else { SnapshotOp::Create };
        let snapshot = self.journal.capture(ctx.session_id, path_str, op, ctx.step_index)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(path_str, e))?;
        }
        std::fs::write(target, content.as_bytes()).map_err(|e| io_err(path_str, e))?;
        let written = std::fs::read(target).map_err(|e| io_err(path_str, e))?;
        if written != content.as_bytes() {
            return Err(ToolError::VerificationFailed(path_str.to_string()));
        }
        self.journal.record_after(&snapshot.id, Some(written))?;
        Ok(json!({"ok": true}))
    }

    fn delete_file(&self, ctx: &ToolContext<'_>, args: &Value) -> ToolResult<Value> {
        let path = str_arg(args, "path")?;
        let target = match self.resolve(ctx, &path) {
            Ok(p) => p,
            Err(v) => return Ok(v),
        };
        let path_str = target.to_string_lossy().into_owned();
        match self.locks.acquire_write_lock(ctx.session_id, &path_str)? {
            LockOutcome::Conflict { conflicting_session, .. } => {
                Ok(json!({"ok": false, "conflictingSession": conflicting_session}))
            }
            LockOutcome::Granted(lock) => {
                let result = self.delete_file_locked(ctx, &target, &path_str);
                self.locks.release(&lock.id, &ctx.session_id)?;
                result
            }
        }
    }

    fn delete_file_locked(&self, ctx: &ToolContext<'_>, target: &Path, path_str: &str) -> ToolResult<Value> {
        self.journal.capture(ctx.session_id, path_str, SnapshotOp::Delete, ctx.step_index)?;
        std::fs::remove_file(target).map_err(|e| io_err(path_str, e))?;
        Ok(json!({"ok": true}))
    }

    fn list_directory(&self, ctx: &ToolContext<'_>, args: &Value) -> ToolResult<Value> {
        let path = args.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let target = match self.resolve(ctx, path) {
            Ok(p) => p,
            Err(v) => return Ok(v),
        };
        let path_str = target.to_string_lossy().into_owned();
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&target).map_err(|e| io_err(&path_str, e))? {
            let entry = entry.map_err(|e| io_err(&path_str, e))?;
            let file_type = entry.file_type().map_err(|e| io_err(&path_str, e))?;
            let kind = if file_type.is_dir() { "directory" } else { "file" };
            entries.push(json!({"name": entry.file_name().to_string_lossy(), "kind": kind}));
        }
        Ok(json!({"ok": true, "entries": entries}))
    }

    fn create_directory(&self, ctx: &ToolContext<'_>, args: &Value) -> ToolResult<Value> {
        let path = str_arg(args, "path")?;
        let target = match self.resolve(ctx, &path) {
            Ok(p) => p,
            Err(v) => return Ok(v),
        };
        std::fs::create_dir_all(&target).map_err(|e| io_err(&target.to_string_lossy(), e))?;
        Ok(json!({"ok": true}))
    }

    fn search_files(&self, ctx: &ToolContext<'_>, args: &Value) -> ToolResult<Value> {
        let query = str_arg(args, "query")?.to_lowercase();
        let dir_arg = args.get("dir").and_then(|v| v.as_str()).unwrap_or(".");
        let root = match self.resolve(ctx, dir_arg) {
            Ok(p) => p,
            Err(v) => return Ok(v),
        };
        let patterns = load_ignore_patterns(Path::new(ctx.project_path));
        let mut matches = Vec::new();
        walk_matching(&root, &patterns, &query, &mut matches);
        matches.sort();
        Ok(json!({"ok": true, "matches": matches}))
    }

    fn get_project_info(&self, ctx: &ToolContext<'_>, args: &Value) -> ToolResult<Value> {
        let include_stats = args.get("includeStats").and_then(|v| v.as_bool()).unwrap_or(false);
        let root = Path::new(ctx.project_path);
        let project_name = root.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let manifests: Vec<&str> =
            MANIFEST_WHITELIST.iter().copied().filter(|m| root.join(m).is_file()).collect();
        let mut result = json!({"ok": true, "projectName": project_name, "manifests": manifests});
        if include_stats {
            let patterns = load_ignore_patterns(root);
            let (file_count, directory_count) = count_stats(root, &patterns);
            result["fileCount"] = json!(file_count);
            result["directoryCount"] = json!(directory_count);
        }
        Ok(result)
    }

    fn finish_work(&self, _ctx: &ToolContext<'_>, args: &Value) -> ToolResult<TerminalSignal> {
        let summary = str_arg(args, "summary")?;
        let changes = args.get("changes").cloned();
        let notes = args.get("notes").and_then(|v| v.as_str()).map(String::from);
        Ok(TerminalSignal::FinishWork { summary, changes, notes })
    }

    fn require_clarification(&self, _ctx: &ToolContext<'_>, args: &Value) -> ToolResult<TerminalSignal> {
        let question = str_arg(args, "question")?;
        let context = args.get("context").cloned();
        let suggestions = args.get("suggestions").cloned();
        Ok(TerminalSignal::RequireClarification { question, context, suggestions })
    }
}

/// The `completed`/`failed` progress entry recorded once a dispatched tool
/// call returns successfully. In-band failures (`{"ok": false, ...}`) still
/// count as `failed` even though they came back through `Ok`.
fn progress_outcome(outcome: &ToolOutcome) -> (ProgressStatus, Option<String>) {
    match outcome {
        ToolOutcome::Value(v) => {
            if v.get("ok").and_then(Value::as_bool) == Some(false) {
                let detail = v
                    .get("error")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .or_else(|| v.get("conflictingSession").map(|s| format!("conflict: {s}")));
                (ProgressStatus::Failed, detail)
            } else {
                (ProgressStatus::Completed, None)
            }
        }
        ToolOutcome::Terminal(TerminalSignal::FinishWork { summary, .. }) => {
            (ProgressStatus::Completed, Some(summary.clone()))
        }
        ToolOutcome::Terminal(TerminalSignal::RequireClarification { question, .. }) => {
            (ProgressStatus::Completed, Some(question.clone()))
        }
    }
}

fn str_arg(args: &Value, key: &str) -> ToolResult<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| ToolError::MissingArg(key.to_string()))
}

fn io_err(path: &str, source: std::io::Error) -> ToolError {
    ToolError::Io { path: path.to_string(), source }
}

/// Lexical `.`/`..` resolution with no filesystem access, so a path that
/// does not exist yet (the common case for `writeFile`/`createDirectory`)
/// can still be bounds-checked.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn walk_matching(dir: &Path, ignore: &[String], query: &str, out: &mut Vec<String>) {
    let Ok(read_dir) = std::fs::read_dir(dir) else { return };
    for entry in read_dir.flatten() {
        let path = entry.path();
        if is_ignored(ignore, &path) {
            continue;
        }
        if path.is_dir() {
            walk_matching(&path, ignore, query, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.to_lowercase().contains(query) {
                out.push(path.to_string_lossy().into_owned());
            }
        }
    }
}

fn count_stats(dir: &Path, ignore: &[String]) -> (usize, usize) {
    let mut files = 0usize;
    let mut dirs = 0usize;
    let Ok(read_dir) = std::fs::read_dir(dir) else { return (files, dirs) };
    for entry in read_dir.flatten() {
        let path = entry.path();
        let is_dotfile =
            path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with('.'));
        if is_dotfile || is_ignored(ignore, &path) {
            continue;
        }
        if path.is_dir() {
            dirs += 1;
            let (f, d) = count_stats(&path, ignore);
            files += f;
            dirs += d;
        } else {
            files += 1;
        }
    }
    (files, dirs)
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
