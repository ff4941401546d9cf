// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format a millisecond epoch timestamp as relative time (e.g. "5s", "2m", "1h", "3d").
pub fn format_time_ago(epoch_ms: u64) -> String {
    if epoch_ms == 0 {
        return "-".to_string();
    }
    let now_ms =
        std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis()
            as u64;
    let elapsed_secs = now_ms.saturating_sub(epoch_ms) / 1000;
    if elapsed_secs < 60 {
        format!("{elapsed_secs}s")
    } else if elapsed_secs < 3600 {
        format!("{}m", elapsed_secs / 60)
    } else if elapsed_secs < 86_400 {
        format!("{}h", elapsed_secs / 3600)
    } else {
        format!("{}d", elapsed_secs / 86_400)
    }
}

/// Render a list as a text table or pretty JSON. Handles the empty check and
/// format branch shared across every `foreman <entity> list` command.
pub fn handle_list<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    empty_msg: &str,
    render_text: impl FnOnce(&[T], &mut dyn Write),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{empty_msg}");
            } else {
                render_text(items, &mut std::io::stdout());
            }
        }
    }
    Ok(())
}

/// Format-branch helper for non-list commands (show, status, etc).
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Text => text_fn(),
    }
    Ok(())
}
