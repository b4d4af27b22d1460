//! Mapping between canonical llmproc state and the OpenAI chat format.
//!
//! Reference: <https://platform.openai.com/docs/api-reference/chat>
//!
//! OpenAI carries tool traffic differently from the canonical state:
//! assistant `ToolUse` blocks become `tool_calls` on the assistant message,
//! and each `ToolResult` block becomes its own `role: "tool"` message.

use llmproc_types::{
    ApiResponse, ContentBlock, Message, ProviderError, Role, StopReason, TokenUsage,
    ToolDefinition,
};

/// Whether a model id belongs to the reasoning (o-family) line.
#[must_use]
pub fn is_o_family(model: &str) -> bool {
    let mut chars = model.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('o'), Some(second)) if second.is_ascii_digit()
    )
}

/// Map the system prompt into the leading `developer` message.
#[must_use]
pub fn map_system(system_prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "role": "developer",
        "content": system_prompt,
    })
}

/// Map canonical messages into OpenAI's message array.
#[must_use]
pub fn map_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    let mut result = Vec::new();

    for message in messages {
        match message.role {
            Role::Assistant => {
                let mut text_parts = Vec::new();
                let mut tool_calls = Vec::new();
                for block in &message.content {
                    match block {
                        ContentBlock::Text(text) => text_parts.push(text.as_str()),
                        ContentBlock::ToolUse { id, name, input } => {
                            tool_calls.push(serde_json::json!({
                                "id": id,
                                "type": "function",
                                "function": {
                                    "name": name,
                                    // OpenAI carries arguments as a JSON string.
                                    "arguments": input.to_string(),
                                },
                            }));
                        }
                        ContentBlock::ToolResult { .. } => {}
                    }
                }

                let mut obj = serde_json::json!({ "role": "assistant" });
                obj["content"] = if text_parts.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(text_parts.concat())
                };
                if !tool_calls.is_empty() {
                    obj["tool_calls"] = serde_json::Value::Array(tool_calls);
                }
                result.push(obj);
            }
            Role::User | Role::Tool => {
                let mut text_parts = Vec::new();
                let mut tool_results = Vec::new();
                for block in &message.content {
                    match block {
                        ContentBlock::Text(text) => text_parts.push(text.as_str()),
                        ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                            ..
                        } => {
                            tool_results.push(serde_json::json!({
                                "role": "tool",
                                "tool_call_id": tool_use_id,
                                "content": content,
                            }));
                        }
                        ContentBlock::ToolUse { .. } => {}
                    }
                }
                if !text_parts.is_empty() {
                    result.push(serde_json::json!({
                        "role": "user",
                        "content": text_parts.concat(),
                    }));
                }
                result.extend(tool_results);
            }
        }
    }

    result
}

/// Map tool definitions into OpenAI's function-tool array.
#[must_use]
pub fn map_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|tool| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                },
            })
        })
        .collect()
}

/// Parse a Chat Completions response body into the normalized form.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidResponse`] when the body has no choices
/// or a tool call is malformed.
pub fn parse_response(body: &serde_json::Value) -> Result<ApiResponse, ProviderError> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| ProviderError::InvalidResponse("response without choices".into()))?;
    let message = &choice["message"];

    let mut blocks = Vec::new();
    if let Some(text) = message["content"].as_str()
        && !text.is_empty()
    {
        blocks.push(ContentBlock::Text(text.to_string()));
    }
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let id = call["id"]
                .as_str()
                .ok_or_else(|| ProviderError::InvalidResponse("tool call without id".into()))?;
            let name = call["function"]["name"]
                .as_str()
                .ok_or_else(|| ProviderError::InvalidResponse("tool call without name".into()))?;
            let raw_arguments = call["function"]["arguments"].as_str().unwrap_or("{}");
            let input = serde_json::from_str(raw_arguments).unwrap_or_else(|_| {
                // Models occasionally emit truncated argument strings;
                // surface them verbatim so the tool layer can reject them.
                serde_json::Value::String(raw_arguments.to_string())
            });
            blocks.push(ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            });
        }
    }

    let stop_reason = match choice["finish_reason"].as_str() {
        Some("tool_calls") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    };

    let usage = TokenUsage {
        input_tokens: body["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
        output_tokens: body["usage"]["completion_tokens"].as_u64().unwrap_or(0),
        cache_creation_input_tokens: None,
        cache_read_input_tokens: body["usage"]["prompt_tokens_details"]["cached_tokens"].as_u64(),
    };

    Ok(ApiResponse {
        id: body["id"].as_str().unwrap_or_default().to_string(),
        model: body["model"].as_str().unwrap_or_default().to_string(),
        message: Message {
            role: Role::Assistant,
            content: blocks,
        },
        stop_reason,
        usage,
    })
}
