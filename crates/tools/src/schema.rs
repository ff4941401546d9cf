// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! JSON-schema-shaped descriptions of the nine tools, presented to the
//! model alongside the message history.

use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// The full tool catalogue, in a fixed, stable order.
pub fn catalogue() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "readFile",
            description: "Read a file's contents as UTF-8.",
            parameters: json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"],
            }),
        },
        ToolSchema {
            name: "writeFile",
            description: "Create or overwrite a file with the given content.",
            parameters: json!({
                "type": "object",
                "properties": {"path": {"type": "string"}, "content": {"type": "string"}},
                "required": ["path", "content"],
            }),
        },
        ToolSchema {
            name: "deleteFile",
            description: "Delete a file.",
            parameters: json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"],
            }),
        },
        ToolSchema {
            name: "listDirectory",
            description: "List the immediate children of a directory.",
            parameters: json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"],
            }),
        },
        ToolSchema {
            name: "createDirectory",
            description: "Create a directory, including parents, idempotently.",
            parameters: json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"],
            }),
        },
        ToolSchema {
            name: "searchFiles",
            description: "Recursively search filenames under the project root.",
            parameters: json!({
                "type": "object",
                "properties": {"query": {"type": "string"}, "dir": {"type": "string"}},
                "required": ["query"],
            }),
        },
        ToolSchema {
            name: "getProjectInfo",
            description: "Return the project root name, detected config manifests, and optional file/directory counts.",
            parameters: json!({
                "type": "object",
                "properties": {"includeStats": {"type": "boolean"}},
            }),
        },
        ToolSchema {
            name: "finishWork",
            description: "Signal that the work is complete and move the session to review.",
            parameters: json!({
                "type": "object",
                "properties": {"summary": {"type": "string"}, "changes": {}, "notes": {"type": "string"}},
                "required": ["summary"],
            }),
        },
        ToolSchema {
            name: "requireClarification",
            description: "Ask the user a question and pause the session until they reply.",
            parameters: json!({
                "type": "object",
                "properties": {"question": {"type": "string"}, "context": {}, "suggestions": {}},
                "required": ["question"],
            }),
        },
    ]
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
