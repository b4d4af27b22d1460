#![deny(missing_docs)]
//! MCP server aggregation for llmproc.
//!
//! The [`McpAggregator`] owns transport to any number of MCP servers and
//! exposes their tools under `<server>__<tool>` names. The tool manager
//! consumes only the aggregate surface: `list_tools` and `call`.

mod aggregator;
mod bridge;
mod client;
mod config;

pub use aggregator::{DEFAULT_TOOL_TIMEOUT, McpAggregator, split_prefixed, timeout_from_env};
pub use bridge::{McpToolBridge, bridges};
pub use client::McpConnection;
pub use config::{McpServerConfig, McpTransport};

pub use llmproc_types::McpError;
