//! Aggregation of several MCP servers behind one tool surface.

use std::collections::HashMap;
use std::time::Duration;

use llmproc_types::{McpError, ToolDefinition, ToolResult};

use crate::client::McpConnection;
use crate::config::McpServerConfig;

/// Default per-call ceiling when no timeout is configured.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable naming the per-call timeout in seconds.
const TIMEOUT_ENV: &str = "LLMPROC_TOOL_FETCH_TIMEOUT";

/// Read the per-call timeout from `LLMPROC_TOOL_FETCH_TIMEOUT`.
///
/// This is the loader's opt-in hook; the aggregator itself takes a plain
/// [`Duration`]. Unparseable values are ignored.
#[must_use]
pub fn timeout_from_env() -> Option<Duration> {
    let raw = std::env::var(TIMEOUT_ENV).ok()?;
    let secs: f64 = raw.trim().parse().ok()?;
    if secs.is_finite() && secs > 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

/// Split a `<server>__<tool>` name into its parts.
///
/// # Errors
///
/// Returns [`McpError::MalformedName`] when the separator is missing or
/// either side is empty.
pub fn split_prefixed(name: &str) -> Result<(&str, &str), McpError> {
    match name.split_once("__") {
        Some((server, tool)) if !server.is_empty() && !tool.is_empty() => Ok((server, tool)),
        _ => Err(McpError::MalformedName(name.to_string())),
    }
}

/// Aggregates tools from several MCP servers.
///
/// Tool names are prefixed `<server>__<tool>`. By default every call opens
/// a fresh connection and closes it afterwards; call
/// [`connect_persistent`](McpAggregator::connect_persistent) to bracket a
/// long-lived connection per server instead. All calls are bounded by the
/// configured timeout.
pub struct McpAggregator {
    servers: Vec<McpServerConfig>,
    timeout: Duration,
    persistent: tokio::sync::Mutex<HashMap<String, McpConnection>>,
}

impl McpAggregator {
    /// Create an aggregator over `servers`.
    ///
    /// The timeout defaults to `LLMPROC_TOOL_FETCH_TIMEOUT` when set,
    /// otherwise [`DEFAULT_TOOL_TIMEOUT`].
    #[must_use]
    pub fn new(servers: Vec<McpServerConfig>) -> Self {
        Self {
            servers,
            timeout: timeout_from_env().unwrap_or(DEFAULT_TOOL_TIMEOUT),
            persistent: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Override the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured servers.
    #[must_use]
    pub fn servers(&self) -> &[McpServerConfig] {
        &self.servers
    }

    /// Open one long-lived connection per server.
    ///
    /// Until [`close_persistent`](McpAggregator::close_persistent) is
    /// called, list/call operations reuse these connections instead of
    /// opening per-call ones.
    ///
    /// # Errors
    ///
    /// Returns the first connection failure; already-opened connections are
    /// kept so a retry only touches the failed servers.
    pub async fn connect_persistent(&self) -> Result<(), McpError> {
        let mut held = self.persistent.lock().await;
        for config in &self.servers {
            if held.contains_key(&config.name) {
                continue;
            }
            let connection = McpConnection::connect(config).await?;
            held.insert(config.name.clone(), connection);
        }
        Ok(())
    }

    /// Close all persistent connections, reverting to per-call mode.
    pub async fn close_persistent(&self) {
        let mut held = self.persistent.lock().await;
        for (name, connection) in held.drain() {
            close_quietly(connection, &name).await;
        }
    }

    /// List all tools across all servers, with prefixed names.
    ///
    /// # Errors
    ///
    /// Returns the first listing failure.
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, McpError> {
        let mut all = Vec::new();
        for config in &self.servers {
            let held = self.persistent.lock().await;
            let tools = if let Some(connection) = held.get(&config.name) {
                connection.list_tools().await?
            } else {
                drop(held);
                let connection = McpConnection::connect(config).await?;
                let tools = connection.list_tools().await;
                close_quietly(connection, &config.name).await;
                tools?
            };
            for mut tool in tools {
                tool.name = format!("{}__{}", config.name, tool.name);
                all.push(tool);
            }
        }
        Ok(all)
    }

    /// Call a tool by its prefixed name.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::MalformedName`] for an unprefixed name,
    /// [`McpError::Timeout`] when the ceiling expires, or the underlying
    /// connection/call failure.
    pub async fn call(
        &self,
        prefixed_name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<ToolResult, McpError> {
        let (server, tool) = split_prefixed(prefixed_name)?;

        let call = async {
            let held = self.persistent.lock().await;
            if let Some(connection) = held.get(server) {
                return connection.call_tool(tool, arguments).await;
            }
            drop(held);

            let config = self
                .servers
                .iter()
                .find(|config| config.name == server)
                .ok_or_else(|| McpError::Connection(format!("unknown MCP server: {server}")))?;
            let connection = McpConnection::connect(config).await?;
            let result = connection.call_tool(tool, arguments).await;
            close_quietly(connection, server).await;
            result
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(McpError::Timeout(self.timeout)),
        }
    }
}

/// Close a connection, logging instead of propagating shutdown failures.
async fn close_quietly(connection: McpConnection, server: &str) {
    if let Err(err) = connection.close().await {
        tracing::warn!(server = %server, error = %err, "MCP shutdown failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_names_split_on_double_underscore() {
        assert_eq!(
            split_prefixed("search__find_papers").unwrap(),
            ("search", "find_papers")
        );
        // Only the first separator splits; tool names may contain more.
        assert_eq!(split_prefixed("a__b__c").unwrap(), ("a", "b__c"));
    }

    #[test]
    fn unprefixed_names_are_malformed() {
        assert!(matches!(
            split_prefixed("sequential-thinking"),
            Err(McpError::MalformedName(_))
        ));
        assert!(matches!(split_prefixed("__tool"), Err(McpError::MalformedName(_))));
        assert!(matches!(split_prefixed("server__"), Err(McpError::MalformedName(_))));
    }

    #[tokio::test]
    async fn call_to_unknown_server_fails() {
        let aggregator = McpAggregator::new(vec![]);
        let err = aggregator.call("ghost__tool", None).await.unwrap_err();
        assert!(matches!(err, McpError::Connection(_)));
    }

    #[test]
    fn env_timeout_parses_fractional_seconds() {
        // Not read from the process environment here; exercise the parse
        // path through a plain value instead.
        let parsed: f64 = "2.5".trim().parse().unwrap();
        assert!(parsed.is_finite() && parsed > 0.0);
        assert_eq!(Duration::from_secs_f64(parsed), Duration::from_millis(2500));
    }
}
