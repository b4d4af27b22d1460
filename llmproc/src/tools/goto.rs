//! The `goto` control tool: conversation time travel.

use llmproc_types::{Message, ToolDefinition, ToolResult};

use crate::process::Process;

pub(crate) fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "goto".into(),
        description: "Rewind the conversation to an earlier point for self-correction. Messages \
                      are addressed as msg_0, msg_1, … in order; the position must name one of \
                      your user's plain messages. That message and everything after it are \
                      discarded and replaced by your new message. Call goto on its own, not \
                      alongside other tools."
            .into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "position": {
                    "type": "string",
                    "description": "Message id to rewind to, e.g. \"msg_3\"."
                },
                "message": {
                    "type": "string",
                    "description": "Replacement user message inserted at that point."
                }
            },
            "required": ["position", "message"]
        }),
    }
}

/// Truncate state at `position` and insert the replacement message wrapped
/// in `<time_travel>` tags.
pub(crate) fn run(process: &mut Process, input: &serde_json::Value) -> ToolResult {
    let Some(position) = input["position"].as_str() else {
        return ToolResult::error("goto requires \"position\"");
    };
    let Some(message) = input["message"].as_str() else {
        return ToolResult::error("goto requires \"message\"");
    };

    let Some(index) = position
        .strip_prefix("msg_")
        .and_then(|raw| raw.parse::<usize>().ok())
    else {
        return ToolResult::error(format!(
            "invalid position {position:?}, expected \"msg_<n>\""
        ));
    };
    if index >= process.state.len() {
        return ToolResult::error(format!(
            "position {position} out of range, state has {} messages (msg_0-msg_{})",
            process.state.len(),
            process.state.len().saturating_sub(1)
        ));
    }
    // Rewinding to anything but a plain user turn would leave a tool use
    // without its result.
    let target = &process.state[index];
    if target.role != llmproc_types::Role::User || target.has_tool_results() {
        return ToolResult::error(format!(
            "position {position} is not a plain user message, cannot rewind there"
        ));
    }

    let discarded = process.state.len() - index;
    process.state.truncate(index);
    process
        .state
        .push(Message::user(format!("<time_travel>\n{message}\n</time_travel>")));
    process.state_rewound = true;
    tracing::debug!(position = %position, discarded, "conversation rewound");

    ToolResult::ok(format!(
        "Rewound to {position}; {discarded} messages discarded."
    ))
}
