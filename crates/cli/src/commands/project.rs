// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `foreman project` — the project-scoped views: `getProjectAgentSummary`,
//! `getAllProjects`, `switchProject`, `cleanupInactiveProjects`.

use crate::output::{format_time_ago, handle_list, OutputFormat};
use anyhow::Result;
use clap::{Args, Subcommand};
use foreman_session::SessionManager;
use std::io::Write as _;
use std::sync::Arc;

#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Aggregate agent counts for one project
    Summary { path: String },
    /// List every project with at least one agent
    List,
    /// List the `doing` agents outside `path` — a read-only preflight; no
    /// agent is paused as a side effect
    Switch { path: String },
    /// Delete every agent whose project has had no activity in `days` days
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: u64,
    },
}

pub async fn handle(
    command: ProjectCommand,
    manager: &Arc<SessionManager>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ProjectCommand::Summary { path } => {
            let summary = manager.get_project_agent_summary(&path);
            match format {
                OutputFormat::Json => {
                    let obj = serde_json::json!({
                        "total": summary.total,
                        "byStatus": summary.by_status,
                        "running": summary.running,
                        "recentActivity": summary.recent_activity,
                    });
                    println!("{}", serde_json::to_string_pretty(&obj)?);
                }
                OutputFormat::Text => {
                    println!("{path}: {} agents, {} running", summary.total, summary.running);
                    for (status, count) in &summary.by_status {
                        println!("  {status}: {count}");
                    }
                }
            }
        }
        ProjectCommand::List => {
            let projects = manager.get_all_projects();
            handle_list(format, &projects, "No projects", |rows, out| {
                for p in rows {
                    let _ = writeln!(
                        out,
                        "{:<40} agents={:<4} running={:<4} last_activity={}",
                        p.project_path,
                        p.agent_count,
                        p.running_agents,
                        format_time_ago(p.last_activity_ms),
                    );
                }
            })?;
        }
        ProjectCommand::Switch { path } => {
            let candidates = manager.switch_project(&path);
            if candidates.is_empty() {
                println!("No other project has a running agent");
            } else {
                println!("Running agents outside {path} (not paused):");
                for session in candidates {
                    println!("  {} ({})", session.id, session.project_path);
                }
            }
        }
        ProjectCommand::Cleanup { days } => {
            let deleted = manager.cleanup_inactive_projects(days)?;
            println!("Deleted {deleted} agent(s) inactive for {days}+ days");
        }
    }
    Ok(())
}
