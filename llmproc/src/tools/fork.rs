//! The `fork` control tool.

use llmproc_types::{ToolDefinition, ToolResult};

use crate::process::Process;

pub(crate) fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "fork".into(),
        description: "Fork this conversation into independent copies, one per prompt. Each copy \
                      inherits the full conversation and file descriptors, runs its prompt to \
                      completion in isolation, and returns its final message. Children cannot \
                      fork again."
            .into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "prompts": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "One prompt per child to run in parallel branches."
                }
            },
            "required": ["prompts"]
        }),
    }
}

/// Run each prompt in a deep-copied child process.
///
/// Children are run to completion one after another; the result lists
/// their final messages in prompt order.
pub(crate) async fn run(process: &mut Process, input: &serde_json::Value) -> ToolResult {
    if !process.fork_enabled {
        return ToolResult::error("fork denied: child processes may not fork");
    }

    let Some(prompts) = input["prompts"].as_array() else {
        return ToolResult::error("fork requires a \"prompts\" array");
    };
    let prompts: Vec<String> = match prompts
        .iter()
        .map(|prompt| prompt.as_str().map(str::to_string))
        .collect()
    {
        Some(prompts) => prompts,
        None => return ToolResult::error("fork prompts must all be strings"),
    };

    let mut replies = Vec::with_capacity(prompts.len());
    for prompt in &prompts {
        let mut child = process.fork_process();
        // Recursion through run() is broken by this box.
        let result = Box::pin(child.run(prompt)).await;
        if let Some(error) = result.error() {
            replies.push(format!("fork child failed: {error}"));
        } else {
            replies.push(result.last_message().to_string());
        }
    }

    match serde_json::to_string(&replies) {
        Ok(rendered) => ToolResult::ok(rendered),
        Err(err) => ToolResult::error(format!("fork result serialization failed: {err}")),
    }
}
