//! Prompt-cache marker placement.
//!
//! Caching is controlled entirely by `cache_control` annotations on the
//! outgoing payload; no transport-level beta header is involved. Callers
//! pass deep copies; persistent conversation state never carries cache
//! metadata.

const EPHEMERAL: &str = "ephemeral";

/// Annotate a shaped payload with ephemeral cache markers.
///
/// Placement:
/// - the system prompt (cached as a unit),
/// - the last tool definition (caches all tool definitions as a unit),
/// - the last message of the payload, regardless of role,
/// - the message immediately preceding the second-most-recent
///   non-tool-result user message, so the shared prefix survives
///   conversational branching.
pub fn apply_cache_markers(
    system: &mut serde_json::Value,
    messages: &mut [serde_json::Value],
    tools: &mut [serde_json::Value],
) {
    if let Some(blocks) = system.as_array_mut()
        && let Some(last) = blocks.last_mut()
    {
        mark(last);
    }

    if let Some(last_tool) = tools.last_mut() {
        mark(last_tool);
    }

    if let Some(last_message) = messages.last_mut() {
        mark_message(last_message);
    }

    if let Some(index) = branching_point(messages)
        && index + 1 < messages.len()
    {
        mark_message(&mut messages[index]);
    }
}

/// Index of the message immediately preceding the second-most-recent
/// non-tool-result user message, when both exist.
fn branching_point(messages: &[serde_json::Value]) -> Option<usize> {
    let mut plain_user_indices = messages
        .iter()
        .enumerate()
        .filter(|(_, message)| is_plain_user(message))
        .map(|(index, _)| index)
        .rev();
    plain_user_indices.next();
    let second_most_recent = plain_user_indices.next()?;
    second_most_recent.checked_sub(1)
}

/// A user message carrying no tool-result blocks.
fn is_plain_user(message: &serde_json::Value) -> bool {
    if message["role"] != "user" {
        return false;
    }
    message["content"]
        .as_array()
        .is_some_and(|blocks| blocks.iter().all(|block| block["type"] != "tool_result"))
}

/// Mark the final content block of a message.
fn mark_message(message: &mut serde_json::Value) {
    if let Some(blocks) = message["content"].as_array_mut()
        && let Some(last) = blocks.last_mut()
    {
        mark(last);
    }
}

/// Attach the marker to one payload object.
fn mark(value: &mut serde_json::Value) {
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "cache_control".into(),
            serde_json::json!({ "type": EPHEMERAL }),
        );
    }
}
