// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `foreman`: a local debug/operator CLI over the Agent Orchestration
//! Core. Every subcommand is a thin wrapper around one
//! `foreman_session::SessionManager` method — this binary exists to
//! drive and inspect the coordination layer directly, the way an IDE's
//! extension host would, without a language-model HTTP client or
//! front-end transport wired in.

mod color;
mod commands;
mod exit_error;
mod model;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{agent, project};
use exit_error::ExitError;
use foreman_engine::ModelClient;
use foreman_session::SessionManager;
use foreman_storage::Store;
use output::OutputFormat;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "foreman", version, about = "Agent orchestration core CLI", styles = color::styles())]
struct Cli {
    /// Directory holding the WAL and checkpoints. Defaults to an
    /// OS-specific user-data directory.
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,
    /// Output format for commands that print records
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    /// Path to a JSON scenario file replayed by a scripted model client,
    /// for demos and integration tests. Without it, `agent start` runs
    /// against a client that ends every turn immediately with no tool
    /// calls (no real model is wired into this binary).
    #[arg(long = "model-script", global = true)]
    model_script: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Agent (session) lifecycle and inspection commands
    Agent(agent::AgentArgs),
    /// Project-scoped aggregate views
    Project(project::ProjectArgs),
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("foreman")
}

fn build_model_client(script: Option<&PathBuf>) -> Result<Arc<dyn ModelClient>> {
    match script {
        Some(path) => Ok(Arc::new(model::ScriptedModelClient::load(path)?)),
        None => Ok(Arc::new(model::NoopModelClient)),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        if let Some(exit_err) = err.downcast_ref::<ExitError>() {
            eprintln!("error: {}", exit_err.message);
            std::process::exit(exit_err.code);
        }
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&data_dir)
        .map_err(|e| anyhow::anyhow!("creating data dir {}: {e}", data_dir.display()))?;

    let store = Arc::new(Store::open(&data_dir)?);
    let model = build_model_client(cli.model_script.as_ref())?;
    let manager = Arc::new(SessionManager::new(store, model));

    let recovered = manager.reconcile_on_startup()?;
    if recovered > 0 {
        tracing::info!(recovered, "annotated sessions left `doing` by an unclean shutdown");
    }

    let result = match cli.command {
        Command::Agent(args) => agent::handle(args.command, &manager, cli.format).await,
        Command::Project(args) => project::handle(args.command, &manager, cli.format).await,
    };

    manager.shutdown().await?;
    result
}
