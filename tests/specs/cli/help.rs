//! CLI help output specs

use crate::prelude::*;

#[test]
fn foreman_help_shows_usage() {
    cli().args(["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn foreman_missing_subcommand_shows_usage_on_stderr() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn foreman_agent_help_shows_subcommands() {
    cli().args(["agent", "--help"]).passes().stdout_has("create").stdout_has("start").stdout_has("delete");
}

#[test]
fn foreman_project_help_shows_subcommands() {
    cli().args(["project", "--help"]).passes().stdout_has("summary").stdout_has("cleanup");
}

#[test]
fn foreman_version_shows_version() {
    cli().args(["--version"]).passes().stdout_has("0.2");
}
