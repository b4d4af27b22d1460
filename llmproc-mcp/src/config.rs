//! MCP server configuration.

use std::collections::HashMap;

/// Transport used to reach an MCP server.
#[derive(Debug, Clone)]
pub enum McpTransport {
    /// Spawn the server as a child process speaking MCP over stdio.
    Stdio {
        /// Executable to launch.
        command: String,
        /// Arguments to pass.
        args: Vec<String>,
        /// Extra environment variables for the child.
        env: HashMap<String, String>,
    },
    /// Connect over streamable HTTP.
    Http {
        /// The server's HTTP endpoint, e.g. `http://localhost:8080/mcp`.
        url: String,
    },
}

/// A named MCP server.
///
/// The name becomes the prefix in `<server>__<tool>` tool names, so it must
/// be unique within one aggregator.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Server name used as the tool-name prefix.
    pub name: String,
    /// How to reach the server.
    pub transport: McpTransport,
}

impl McpServerConfig {
    /// A stdio server launched as `command args…`.
    #[must_use]
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            transport: McpTransport::Stdio {
                command: command.into(),
                args,
                env: HashMap::new(),
            },
        }
    }

    /// An HTTP server at `url`.
    #[must_use]
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: McpTransport::Http { url: url.into() },
        }
    }
}
