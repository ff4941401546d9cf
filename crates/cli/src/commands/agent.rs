// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `foreman agent` — the createAgent/listAgents/.../checkFileConflicts
//! command surface, one subcommand per facade method on
//! `foreman_session::SessionManager`.

use crate::exit_error::ExitError;
use crate::output::{format_time_ago, format_or_json, handle_list, OutputFormat};
use anyhow::Result;
use clap::{Args, Subcommand};
use foreman_core::{MessageRole, SessionId, SessionStatus};
use foreman_session::{CreateAgentRequest, SessionManager, StartAgentOptions};
use std::io::Write as _;
use std::sync::Arc;

#[derive(Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommand,
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Create a new agent bound to a project
    Create {
        /// Display name
        name: String,
        /// Absolute or relative path to the project root
        #[arg(long = "project")]
        project_path: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "project-name")]
        project_name: Option<String>,
        #[arg(long = "workspace-root")]
        workspace_root: Option<String>,
        /// Seed the conversation with an initial user message
        #[arg(long = "prompt")]
        initial_prompt: Option<String>,
    },
    /// List agents, optionally filtered by project and/or status
    List {
        #[arg(long = "project")]
        project_path: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one agent's record
    Get { id: String },
    /// Delete an agent, stopping it first if running
    Delete { id: String },
    /// Start (or resume) an agent's execution
    Start {
        id: String,
        #[arg(long = "max-steps")]
        max_steps: Option<u64>,
        #[arg(long = "auto-retry")]
        auto_retry: Option<bool>,
        #[arg(long = "retry-attempts")]
        retry_attempts: Option<u32>,
        /// Return immediately instead of waiting for a terminal status
        #[arg(long = "no-wait")]
        no_wait: bool,
        /// Give up waiting after this many seconds (ignored with --no-wait)
        #[arg(long = "wait-timeout", default_value_t = 30)]
        wait_timeout_secs: u64,
    },
    /// Stop a running agent
    Stop {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Validated status transition (accept/reject a review, etc.)
    Status { id: String, status: String },
    /// Append a user or system message
    Message { id: String, role: String, content: String },
    /// List an agent's conversation
    Messages {
        id: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List an agent's progress log
    Progress { id: String },
    /// List agent ids currently occupying a worker slot
    Running,
    /// Preflight a set of paths for lock conflicts before writing
    Conflicts { id: String, paths: Vec<String> },
}

/// Polls `get_agent` until its status leaves `doing` or `wait_timeout_secs`
/// elapses. The only way this binary observes a background execution
/// finishing — `start_agent` itself only reports that the spawn succeeded.
async fn wait_for_terminal(manager: &Arc<SessionManager>, id: &SessionId, wait_timeout_secs: u64) -> Result<()> {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(wait_timeout_secs);
    loop {
        let Some(session) = manager.get_agent(id) else {
            anyhow::bail!("agent {id} disappeared while waiting");
        };
        if session.status != SessionStatus::Doing {
            println!("Agent {id} is now {}", session.status);
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            println!("Timed out waiting for agent {id}; still {}", session.status);
            return Ok(());
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

fn parse_status(s: &str) -> Result<SessionStatus> {
    Ok(match s {
        "ideas" => SessionStatus::Ideas,
        "todo" => SessionStatus::Todo,
        "doing" => SessionStatus::Doing,
        "review" => SessionStatus::Review,
        "accepted" => SessionStatus::Accepted,
        "rejected" => SessionStatus::Rejected,
        "need_clarification" => SessionStatus::NeedClarification,
        other => anyhow::bail!(
            "unknown status '{other}' (expected one of: ideas, todo, doing, review, accepted, rejected, need_clarification)"
        ),
    })
}

fn parse_role(s: &str) -> Result<MessageRole> {
    Ok(match s {
        "user" => MessageRole::User,
        "system" => MessageRole::System,
        other => anyhow::bail!("unknown role '{other}' (expected 'user' or 'system')"),
    })
}

pub async fn handle(
    command: AgentCommand,
    manager: &Arc<SessionManager>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        AgentCommand::Create { name, project_path, description, project_name, workspace_root, initial_prompt } => {
            let session = manager.create_agent(CreateAgentRequest {
                name,
                description,
                project_path,
                project_name,
                workspace_root,
                initial_prompt,
            })?;
            format_or_json(format, &session, || {
                println!(
                    "Created agent {} '{}' ({})",
                    crate::color::header(&session.id.to_string()),
                    session.name,
                    session.project_path
                );
            })?;
        }
        AgentCommand::List { project_path, status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let summaries = manager.list_agents(project_path.as_deref(), status);
            handle_list(format, &summaries, "No agents", |rows, out| {
                let id_width = rows.iter().map(|r| r.session.id.to_string().len()).max().unwrap_or(0).max(2);
                let _ = writeln!(out, "{:<id_width$} STATUS               STEPS  UPDATED  NAME", "ID");
                for row in rows {
                    let _ = writeln!(
                        out,
                        "{:<id_width$} {:<20} {:<6} {:<8} {}",
                        row.session.id,
                        row.session.status,
                        format!("{}/{}", row.progress.completed_steps, row.progress.total_steps),
                        format_time_ago(row.session.updated_at_ms),
                        row.session.name,
                    );
                }
            })?;
        }
        AgentCommand::Get { id } => {
            let id = SessionId::from_string(&id);
            let session = manager
                .get_agent(&id)
                .ok_or_else(|| ExitError::new(1, format!("agent not found: {id}")))?;
            format_or_json(format, &session, || {
                println!("{}  {}", crate::color::header(&session.id.to_string()), session.name);
                println!("  status:  {}", session.status);
                println!("  project: {}", session.project_path);
                if let Some(desc) = &session.description {
                    println!("  desc:    {desc}");
                }
                println!("  updated: {}", format_time_ago(session.updated_at_ms));
            })?;
        }
        AgentCommand::Delete { id } => {
            let id = SessionId::from_string(&id);
            manager.delete_agent(id)?;
            println!("Deleted agent {id}");
        }
        AgentCommand::Start { id, max_steps, auto_retry, retry_attempts, no_wait, wait_timeout_secs } => {
            let id = SessionId::from_string(&id);
            let started = manager
                .start_agent(id, Some(StartAgentOptions { max_steps, auto_retry, retry_attempts }))
                .await?;
            println!("Agent {id} started: {started}");
            if !no_wait {
                wait_for_terminal(manager, &id, wait_timeout_secs).await?;
            }
        }
        AgentCommand::Stop { id, reason } => {
            let id = SessionId::from_string(&id);
            manager.stop_agent(id, reason)?;
            println!("Stop requested for agent {id}");
        }
        AgentCommand::Status { id, status } => {
            let id = SessionId::from_string(&id);
            let status = parse_status(&status)?;
            manager.update_agent_status(id, status)?;
            println!("Agent {id} -> {status}");
        }
        AgentCommand::Message { id, role, content } => {
            let id = SessionId::from_string(&id);
            let role = parse_role(&role)?;
            let message = manager.add_message(id, role, content)?;
            format_or_json(format, &message, || {
                println!("Added message {} to agent {id}", message.id);
            })?;
        }
        AgentCommand::Messages { id, limit } => {
            let id = SessionId::from_string(&id);
            let messages = manager.get_messages(&id, limit);
            handle_list(format, &messages, "No messages", |rows, out| {
                for m in rows {
                    let _ = writeln!(out, "[{}] {:<9} {}", m.step_index, m.role, m.content);
                }
            })?;
        }
        AgentCommand::Progress { id } => {
            let id = SessionId::from_string(&id);
            let entries = manager.get_progress(&id);
            handle_list(format, &entries, "No progress entries", |rows, out| {
                for p in rows {
                    let _ = writeln!(out, "[{}] {:<9} {}", format_time_ago(p.timestamp_ms), p.status, p.step);
                }
            })?;
        }
        AgentCommand::Running => {
            let running = manager.get_running_agents();
            if running.is_empty() {
                println!("No agents running");
            } else {
                for id in running {
                    println!("{id}");
                }
            }
        }
        AgentCommand::Conflicts { id, paths } => {
            let id = SessionId::from_string(&id);
            let report = manager.check_file_conflicts(id, &paths);
            if report.can_proceed {
                println!("No conflicts; safe to proceed");
            } else {
                println!("Conflicts on:");
                for path in &report.conflicts {
                    println!("  {path}");
                }
                if let Some(suggestions) = &report.suggestions {
                    for s in suggestions {
                        println!("  hint: {s}");
                    }
                }
            }
        }
    }
    Ok(())
}
