//! Mapping between canonical llmproc state and the Anthropic wire format.
//!
//! Reference: <https://docs.anthropic.com/en/api/messages>

use llmproc_types::{
    ApiResponse, ContentBlock, Message, ProviderError, Role, StopReason, TokenUsage,
    ToolDefinition,
};

/// Map a message list into Anthropic's messages array.
///
/// System-role content never appears here; the system prompt rides in the
/// top-level `system` field.
#[must_use]
pub fn map_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::Assistant => "assistant",
                // Canonical state carries tool results in user messages.
                Role::User | Role::Tool => "user",
            };
            serde_json::json!({
                "role": role,
                "content": map_content_blocks(&message.content),
            })
        })
        .collect()
}

/// Map content blocks into Anthropic's content array.
#[must_use]
pub fn map_content_blocks(blocks: &[ContentBlock]) -> Vec<serde_json::Value> {
    blocks.iter().map(map_content_block).collect()
}

fn map_content_block(block: &ContentBlock) -> serde_json::Value {
    match block {
        ContentBlock::Text(text) => serde_json::json!({
            "type": "text",
            "text": text,
        }),
        ContentBlock::ToolUse { id, name, input } => serde_json::json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => serde_json::json!({
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": content,
            "is_error": is_error,
        }),
    }
}

/// Map a system prompt into a block array.
///
/// Blocks rather than a bare string so a cache marker can attach to the
/// final block.
#[must_use]
pub fn map_system(system_prompt: &str) -> serde_json::Value {
    serde_json::json!([{ "type": "text", "text": system_prompt }])
}

/// Map tool definitions into Anthropic's tools array.
#[must_use]
pub fn map_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|tool| {
            serde_json::json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.input_schema,
            })
        })
        .collect()
}

/// The `thinking` parameter for a given token budget.
#[must_use]
pub fn thinking_param(budget_tokens: u64) -> serde_json::Value {
    serde_json::json!({
        "type": "enabled",
        "budget_tokens": budget_tokens,
    })
}

/// Parse a Messages API response body into the normalized form.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidResponse`] when required fields are
/// missing or blocks have an unknown shape.
pub fn parse_response(body: &serde_json::Value) -> Result<ApiResponse, ProviderError> {
    let content = body["content"]
        .as_array()
        .ok_or_else(|| ProviderError::InvalidResponse("missing content array".into()))?;

    let mut blocks = Vec::with_capacity(content.len());
    for block in content {
        match block["type"].as_str() {
            Some("text") => {
                let text = block["text"]
                    .as_str()
                    .ok_or_else(|| ProviderError::InvalidResponse("text block without text".into()))?;
                blocks.push(ContentBlock::Text(text.to_string()));
            }
            Some("tool_use") => {
                let id = block["id"]
                    .as_str()
                    .ok_or_else(|| ProviderError::InvalidResponse("tool_use without id".into()))?;
                let name = block["name"]
                    .as_str()
                    .ok_or_else(|| ProviderError::InvalidResponse("tool_use without name".into()))?;
                blocks.push(ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input: block["input"].clone(),
                });
            }
            // Thinking and other block kinds carry no conversational state
            // the runtime tracks; skip them.
            Some(_) => {}
            None => {
                return Err(ProviderError::InvalidResponse(
                    "content block without type".into(),
                ));
            }
        }
    }

    let stop_reason = body["stop_reason"]
        .as_str()
        .map_or(StopReason::EndTurn, StopReason::parse);

    let usage = TokenUsage {
        input_tokens: body["usage"]["input_tokens"].as_u64().unwrap_or(0),
        output_tokens: body["usage"]["output_tokens"].as_u64().unwrap_or(0),
        cache_creation_input_tokens: body["usage"]["cache_creation_input_tokens"].as_u64(),
        cache_read_input_tokens: body["usage"]["cache_read_input_tokens"].as_u64(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_results_ride_in_user_messages() {
        let messages = vec![
            Message {
                role: Role::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: "tu_1".into(),
                    name: "calculator".into(),
                    input: json!({"expression": "2+2"}),
                }],
            },
            Message {
                role: Role::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: "tu_1".into(),
                    content: "4".into(),
                    is_error: false,
                }],
            },
        ];

        let mapped = map_messages(&messages);
        assert_eq!(mapped[0]["role"], "assistant");
        assert_eq!(mapped[0]["content"][0]["type"], "tool_use");
        assert_eq!(mapped[1]["role"], "user");
        assert_eq!(mapped[1]["content"][0]["type"], "tool_result");
        assert_eq!(mapped[1]["content"][0]["tool_use_id"], "tu_1");
    }

    #[test]
    fn system_maps_to_block_array() {
        let system = map_system("Be terse.");
        assert_eq!(system[0]["type"], "text");
        assert_eq!(system[0]["text"], "Be terse.");
    }

    #[test]
    fn tools_map_name_description_schema() {
        let tools = vec![ToolDefinition {
            name: "calculator".into(),
            description: "Evaluates expressions".into(),
            input_schema: json!({"type": "object"}),
        }];
        let mapped = map_tools(&tools);
        assert_eq!(mapped[0]["name"], "calculator");
        assert_eq!(mapped[0]["input_schema"]["type"], "object");
    }

    #[test]
    fn parse_text_response() {
        let body = json!({
            "id": "msg_01",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": "Hello!"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 4}
        });
        let response = parse_response(&body).unwrap();
        assert_eq!(response.message.text(), "Hello!");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.input_tokens, 12);
        assert_eq!(response.usage.cache_read_input_tokens, None);
    }

    #[test]
    fn parse_tool_use_response_with_cache_usage() {
        let body = json!({
            "id": "msg_02",
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "tu_9", "name": "read_fd", "input": {"fd": "fd:1"}}
            ],
            "stop_reason": "tool_use",
            "usage": {
                "input_tokens": 100,
                "output_tokens": 20,
                "cache_creation_input_tokens": 80,
                "cache_read_input_tokens": 400
            }
        });
        let response = parse_response(&body).unwrap();
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        let uses = response.message.tool_uses();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].1, "read_fd");
        assert_eq!(response.usage.cache_creation_input_tokens, Some(80));
        assert_eq!(response.usage.cache_read_input_tokens, Some(400));
    }

    #[test]
    fn unknown_block_kinds_are_skipped() {
        let body = json!({
            "id": "msg_03",
            "model": "m",
            "content": [
                {"type": "thinking", "thinking": "...", "signature": "sig"},
                {"type": "text", "text": "done"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        });
        let response = parse_response(&body).unwrap();
        assert_eq!(response.message.content.len(), 1);
        assert_eq!(response.message.text(), "done");
    }

    #[test]
    fn missing_content_is_invalid() {
        let err = parse_response(&json!({"id": "x"})).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
