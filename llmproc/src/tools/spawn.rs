//! The `spawn` control tool.

use std::sync::Arc;

use llmproc_fd::ReadSpec;
use llmproc_types::{ToolDefinition, ToolResult};

use crate::process::Process;
use crate::program::Program;

pub(crate) fn definition(program: &Program) -> ToolDefinition {
    let catalog: Vec<String> = program
        .linked
        .iter()
        .map(|(name, link)| format!("{name}: {}", link.description))
        .collect();

    let mut properties = serde_json::json!({
        "program_name": {
            "type": "string",
            "description": format!("Which linked program to run. Available: {}", catalog.join("; "))
        },
        "query": {
            "type": "string",
            "description": "The request to send to the linked program."
        },
        "additional_preload_files": {
            "type": "array",
            "items": {"type": "string"},
            "description": "Files whose contents are added to the child's system prompt."
        }
    });
    if program.fd_enabled()
        && let Some(obj) = properties.as_object_mut()
    {
        obj.insert(
            "additional_preload_fds".into(),
            serde_json::json!({
                "type": "array",
                "items": {"type": "string"},
                "description": "File descriptors whose full contents are added to the child's system prompt."
            }),
        );
    }

    ToolDefinition {
        name: "spawn".into(),
        description: "Run a linked program with a query and return its final message. The child \
                      keeps its state between spawns."
            .into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": ["program_name", "query"]
        }),
    }
}

/// Resolve a linked program, instantiate it on first use, inject any
/// additional preloads, and run the query.
pub(crate) async fn run(process: &mut Process, input: &serde_json::Value) -> ToolResult {
    let Some(name) = input["program_name"].as_str() else {
        return ToolResult::error("spawn requires \"program_name\"");
    };
    let Some(query) = input["query"].as_str() else {
        return ToolResult::error("spawn requires \"query\"");
    };

    let Some(link) = process.program.linked.get(name).cloned() else {
        let catalog: Vec<String> = process
            .program
            .linked
            .iter()
            .map(|(linked_name, link)| format!("{linked_name}: {}", link.description))
            .collect();
        return ToolResult::error(format!(
            "Program {name:?} not found. Available programs: {}",
            if catalog.is_empty() {
                "(none)".to_string()
            } else {
                catalog.join("; ")
            }
        ));
    };

    // Gather preload blocks before touching the child so descriptor reads
    // see the parent's store.
    let mut enrichment = Vec::new();
    if let Some(fd_ids) = input["additional_preload_fds"].as_array() {
        if !process.program.fd_enabled() {
            return ToolResult::error(
                "additional_preload_fds requires the file descriptor system",
            );
        }
        for fd_id in fd_ids {
            let Some(fd_id) = fd_id.as_str() else {
                return ToolResult::error("additional_preload_fds must be strings");
            };
            match process.fd_manager.read(fd_id, &ReadSpec::all()) {
                Ok(slice) => enrichment.push(format!(
                    "<preload>\n<fd id=\"{fd_id}\">\n{}\n</fd>\n</preload>",
                    slice.content
                )),
                Err(err) => {
                    return ToolResult::error(format!("cannot preload {fd_id}: {err}"));
                }
            }
        }
    }
    if let Some(paths) = input["additional_preload_files"].as_array() {
        for path in paths {
            let Some(path) = path.as_str() else {
                return ToolResult::error("additional_preload_files must be strings");
            };
            match tokio::fs::read_to_string(path).await {
                Ok(content) => enrichment.push(format!(
                    "<preload>\n<file path=\"{path}\">\n{content}\n</file>\n</preload>"
                )),
                Err(err) => {
                    return ToolResult::error(format!("cannot preload {path}: {err}"));
                }
            }
        }
    }

    // Instantiate the child on first spawn; later spawns reuse it.
    if !process.linked_instances.contains_key(name) {
        match link.program.start(Arc::clone(&process.client)).await {
            Ok(child) => {
                process.linked_instances.insert(name.to_string(), child);
            }
            Err(err) => {
                return ToolResult::error(format!("failed to start program {name:?}: {err}"));
            }
        }
    }
    let Some(child) = process.linked_instances.get_mut(name) else {
        return ToolResult::error(format!("program {name:?} disappeared during spawn"));
    };

    for block in &enrichment {
        child.append_enrichment(block);
    }

    let result = Box::pin(child.run(query)).await;
    match result.error() {
        Some(error) => ToolResult::error(format!("spawned program {name:?} failed: {error}")),
        None => ToolResult::ok(result.last_message().to_string()),
    }
}
