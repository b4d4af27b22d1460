//! A single MCP server connection.

use std::borrow::Cow;

use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParams, CallToolResult, Content, RawContent};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransport;

use llmproc_types::{McpError, ToolDefinition, ToolResult};

use crate::config::{McpServerConfig, McpTransport};

/// A live connection to one MCP server.
pub struct McpConnection {
    service: RunningService<RoleClient, ()>,
}

impl McpConnection {
    /// Connect to the server described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Connection`] if the process cannot be spawned,
    /// the HTTP endpoint is unreachable, or the MCP handshake fails.
    pub async fn connect(config: &McpServerConfig) -> Result<Self, McpError> {
        let service = match &config.transport {
            McpTransport::Stdio { command, args, env } => {
                let mut cmd = tokio::process::Command::new(command);
                cmd.args(args);
                cmd.envs(env);
                let transport = TokioChildProcess::new(cmd)
                    .map_err(|e| McpError::Connection(e.to_string()))?;
                ()
                    .serve(transport)
                    .await
                    .map_err(|e| McpError::Connection(e.to_string()))?
            }
            McpTransport::Http { url } => {
                let transport = StreamableHttpClientTransport::from_uri(url.as_str());
                ()
                    .serve(transport)
                    .await
                    .map_err(|e| McpError::Connection(e.to_string()))?
            }
        };
        tracing::debug!(server = %config.name, "connected to MCP server");
        Ok(Self { service })
    }

    /// List the server's tools as unprefixed definitions.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Transport`] if the listing request fails.
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, McpError> {
        let tools = self
            .service
            .list_all_tools()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(tools
            .into_iter()
            .map(|tool| ToolDefinition {
                name: tool.name.to_string(),
                description: tool.description.as_deref().unwrap_or("").to_string(),
                input_schema: serde_json::to_value(&*tool.input_schema)
                    .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
            })
            .collect())
    }

    /// Call a tool by its unprefixed name.
    ///
    /// A server-reported tool failure comes back as an error [`ToolResult`],
    /// not an `Err`, so the conversation survives it.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::ToolCall`] on protocol-level failure.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<ToolResult, McpError> {
        let params = CallToolRequestParams {
            meta: None,
            name: Cow::Owned(name.to_string()),
            arguments,
            task: None,
        };
        let result = self
            .service
            .peer()
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCall(e.to_string()))?;
        Ok(call_result_to_tool_result(result))
    }

    /// Shut down the connection.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Connection`] if the shutdown handshake fails.
    pub async fn close(self) -> Result<(), McpError> {
        self.service
            .cancel()
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;
        Ok(())
    }
}

/// Convert an MCP call result into a [`ToolResult`].
fn call_result_to_tool_result(result: CallToolResult) -> ToolResult {
    let is_error = result.is_error == Some(true);
    // Prefer structured content when the server provides it.
    let content = match result.structured_content {
        Some(structured) => structured.to_string(),
        None => extract_text(&result.content),
    };
    ToolResult { content, is_error }
}

/// Join the text blocks of MCP content.
fn extract_text(content: &[Content]) -> String {
    content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
