//! Conversation data model and the normalized provider surface.

use serde::{Deserialize, Serialize};

use crate::BoxFuture;
use crate::error::ProviderError;

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// A human user. Tool results also ride in user messages in the
    /// canonical state (Anthropic-shaped).
    User,
    /// The model.
    Assistant,
    /// An OpenAI-style tool message. Never stored in canonical process
    /// state; produced only during wire-format shaping.
    Tool,
}

/// A content block within a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentBlock {
    /// Plain text content.
    Text(String),
    /// A tool invocation request from the assistant.
    ToolUse {
        /// Unique identifier for this tool call.
        id: String,
        /// Name of the tool to invoke.
        name: String,
        /// JSON input arguments.
        input: serde_json::Value,
    },
    /// Result of a tool invocation, answering a prior `ToolUse`.
    ToolResult {
        /// References the `id` from the corresponding `ToolUse`.
        tool_use_id: String,
        /// The result content.
        content: String,
        /// Whether this result represents an error.
        is_error: bool,
    },
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// The content blocks of this message.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a user message with a single text content block.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text(text.into())],
        }
    }

    /// Create an assistant message with a single text content block.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text(text.into())],
        }
    }

    /// Create a user message carrying one tool-result block per entry,
    /// preserving the given order.
    #[must_use]
    pub fn tool_results(results: Vec<(String, ToolResult)>) -> Self {
        Self {
            role: Role::User,
            content: results
                .into_iter()
                .map(|(tool_use_id, result)| ContentBlock::ToolResult {
                    tool_use_id,
                    content: result.content,
                    is_error: result.is_error,
                })
                .collect(),
        }
    }

    /// Concatenated text of all `Text` blocks in this message.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| {
                if let ContentBlock::Text(text) = block {
                    Some(text.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// All `ToolUse` blocks in this message as `(id, name, input)` triples,
    /// in order of appearance.
    #[must_use]
    pub fn tool_uses(&self) -> Vec<(String, String, serde_json::Value)> {
        self.content
            .iter()
            .filter_map(|block| {
                if let ContentBlock::ToolUse { id, name, input } = block {
                    Some((id.clone(), name.clone(), input.clone()))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Whether any block in this message is a `ToolResult`.
    #[must_use]
    pub fn has_tool_results(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolResult { .. }))
    }
}

/// Output of a tool execution, before it is attached to a `tool_use_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The result content.
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

impl ToolResult {
    /// A successful result.
    #[must_use]
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// An error result. The conversation continues; the model sees the
    /// message and can self-correct.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }
}

/// Definition of a tool as exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name (unique identifier).
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: serde_json::Value,
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Model reached a natural end.
    EndTurn,
    /// Model wants to use a tool.
    ToolUse,
    /// Hit the max token limit.
    MaxTokens,
    /// Hit a stop sequence.
    StopSequence,
}

impl StopReason {
    /// The provider wire string for this reason.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EndTurn => "end_turn",
            Self::ToolUse => "tool_use",
            Self::MaxTokens => "max_tokens",
            Self::StopSequence => "stop_sequence",
        }
    }

    /// Parse a provider wire string. Unknown values map to `EndTurn`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "tool_use" => Self::ToolUse,
            "max_tokens" | "length" => Self::MaxTokens,
            "stop_sequence" => Self::StopSequence,
            _ => Self::EndTurn,
        }
    }
}

/// Token usage reported for a single API call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the input/prompt.
    pub input_tokens: u64,
    /// Tokens in the output/completion.
    pub output_tokens: u64,
    /// Tokens written to the prompt cache, if reported.
    pub cache_creation_input_tokens: Option<u64>,
    /// Tokens read from the prompt cache, if reported.
    pub cache_read_input_tokens: Option<u64>,
}

impl TokenUsage {
    /// Accumulate another usage record into this one.
    pub fn add(&mut self, delta: &TokenUsage) {
        self.input_tokens += delta.input_tokens;
        self.output_tokens += delta.output_tokens;
        if let Some(creation) = delta.cache_creation_input_tokens {
            *self.cache_creation_input_tokens.get_or_insert(0) += creation;
        }
        if let Some(read) = delta.cache_read_input_tokens {
            *self.cache_read_input_tokens.get_or_insert(0) += read;
        }
    }
}

/// A fully shaped provider request.
///
/// Executors own payload shaping: `system`, `messages`, and `tools` arrive
/// here already in the provider's wire format (including any cache-control
/// markers). Clients add transport concerns only (auth headers, base URL,
/// status mapping).
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    /// The model identifier.
    pub model: String,
    /// The system prompt in provider wire format. `Value::Null` when absent.
    pub system: serde_json::Value,
    /// The messages array in provider wire format.
    pub messages: Vec<serde_json::Value>,
    /// Tool definitions in provider wire format.
    pub tools: Vec<serde_json::Value>,
    /// Remaining top-level body fields (max_tokens, temperature, thinking…).
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Extra HTTP headers (for example beta feature flags).
    pub extra_headers: Vec<(String, String)>,
}

/// A normalized provider response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Provider-assigned message ID.
    pub id: String,
    /// The model that generated this response.
    pub model: String,
    /// The assistant message (text and tool-use blocks, in order).
    pub message: Message,
    /// Why the model stopped generating.
    pub stop_reason: StopReason,
    /// Token usage for this call.
    pub usage: TokenUsage,
}

/// Transport client for one provider API.
///
/// Object-safe by design: a process holds `Arc<dyn ProviderClient>` and the
/// handle is shared across fork and spawn. Implementations parse their wire
/// responses into the normalized [`ApiResponse`].
pub trait ProviderClient: Send + Sync {
    /// Send a shaped request and return the normalized response.
    fn create(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ProviderError>>;

    /// Count input tokens for a shaped request without generating.
    ///
    /// Providers without a counting endpoint return
    /// [`ProviderError::Unsupported`].
    fn count_tokens(&self, request: ApiRequest) -> BoxFuture<'_, Result<u64, ProviderError>> {
        let _ = request;
        Box::pin(async {
            Err(ProviderError::Unsupported(
                "token counting not supported by this provider".into(),
            ))
        })
    }
}
