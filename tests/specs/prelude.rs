//! Shared black-box CLI test harness.
//!
//! `cli()` builds a bare invocation of the `foreman` binary; `Project`
//! bundles a scratch project directory with its own `--data-dir`, so each
//! test runs against an isolated store and filesystem root.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct CliCmd {
    cmd: Command,
}

impl CliCmd {
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.cmd.args(args);
        self
    }

    pub fn arg(mut self, arg: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.arg(arg);
        self
    }

    pub fn command(self) -> Command {
        self.cmd
    }

    /// Runs the command, asserts a zero exit code, and returns the captured
    /// output for further `.stdout_has()`/`.stdout()` chaining.
    pub fn passes(mut self) -> Output {
        let assert = self.cmd.assert().success();
        Output { output: assert.get_output().clone() }
    }

    /// Runs the command, asserts a non-zero exit code.
    pub fn fails(mut self) -> Output {
        let assert = self.cmd.assert().failure();
        Output { output: assert.get_output().clone() }
    }
}

pub struct Output {
    output: std::process::Output,
}

impl Output {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout().contains(needle),
            "expected stdout to contain {needle:?}, got:\n{}",
            self.stdout()
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr().contains(needle),
            "expected stderr to contain {needle:?}, got:\n{}",
            self.stderr()
        );
        self
    }
}

/// A bare `foreman` invocation with no `--data-dir` bound — callers that
/// only care about `--help`/`--version` output don't need a scratch store.
pub fn cli() -> CliCmd {
    CliCmd { cmd: Command::cargo_bin("foreman").expect("foreman binary built") }
}

/// A scratch project directory plus its own isolated `--data-dir`, so
/// concurrent tests never share a WAL.
pub struct Project {
    data_dir: TempDir,
    project_dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            data_dir: TempDir::new().expect("data dir"),
            project_dir: TempDir::new().expect("project dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.project_dir.path()
    }

    pub fn data_dir(&self) -> &Path {
        self.data_dir.path()
    }

    /// Writes `relative` under the project root, creating parent
    /// directories as needed, and returns the absolute path written.
    pub fn file(&self, relative: &str, contents: &str) -> PathBuf {
        let full = self.project_dir.path().join(relative);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full, contents).unwrap();
        full
    }

    pub fn read(&self, relative: &str) -> Option<String> {
        std::fs::read_to_string(self.project_dir.path().join(relative)).ok()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.project_dir.path().join(relative).exists()
    }

    /// A `foreman` invocation pre-bound to this project's scratch
    /// `--data-dir`.
    pub fn foreman(&self) -> CliCmd {
        cli().args(["--data-dir", self.data_dir.path().to_str().unwrap()])
    }

    /// Writes a scripted model scenario (see `foreman-cli`'s
    /// `ScriptedModelClient`) and returns its path.
    pub fn model_script(&self, json: &str) -> PathBuf {
        let path = self.data_dir.path().join("model-script.json");
        std::fs::write(&path, json).unwrap();
        path
    }
}
