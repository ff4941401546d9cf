// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Default + project-level ignore rules for `searchFiles` and
//! `getProjectInfo`'s recursive stats.

use std::path::Path;

/// Skipped unconditionally, regardless of any project ignore file.
pub const DEFAULT_IGNORE: &[&str] = &[".git", "node_modules", "target", ".venv", "dist", "build"];

/// Built-in defaults plus every non-comment, non-blank line of a
/// `.ignore`/`.gitignore` at the project root, if present. No glob engine
/// is added for this — each pattern is matched as a literal path-component
/// equality, which is enough for a default ignore list plus any top-level
/// ignore file patterns.
pub fn load_ignore_patterns(project_root: &Path) -> Vec<String> {
    let mut patterns: Vec<String> = DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect();
    for name in [".ignore", ".gitignore"] {
        if let Ok(text) = std::fs::read_to_string(project_root.join(name)) {
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                patterns.push(line.trim_end_matches('/').to_string());
            }
        }
    }
    patterns
}

/// True if any component of `path` matches an ignore pattern exactly.
pub fn is_ignored(patterns: &[String], path: &Path) -> bool {
    path.components().any(|c| {
        let component = c.as_os_str().to_string_lossy();
        patterns.iter().any(|p| component == p.as_str())
    })
}

#[cfg(test)]
#[path = "ignore_tests.rs"]
mod tests;
