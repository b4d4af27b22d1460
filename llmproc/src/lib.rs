#![deny(missing_docs)]
//! A runtime that treats language-model interactions as operating-system
//! processes.
//!
//! A [`Program`] is an immutable compiled configuration of model, prompts,
//! tools, linked programs, and limits. A [`Process`] is a live instance that
//! owns conversation state, a file-descriptor store, and tool bindings.
//! [`Process::run`] drives the provider loop (assemble → call → dispatch →
//! append) to a stop condition and returns a [`RunResult`] of telemetry.
//!
//! Process primitives (`fork`, `spawn`, `goto`, `read_fd`, `fd_to_file`)
//! are control tools the model itself calls; the kernel dispatches them
//! with full process access while ordinary tools see only their arguments.

mod callbacks;
mod cost;
mod executor;
mod manager;
mod process;
mod program;
mod result;
mod tools;

pub use callbacks::RunHook;
pub use cost::CostModel;
pub use executor::tokens::{TokenCount, context_window_for};
pub use executor::{AnthropicExecutor, OpenAiExecutor, ProcessExecutor};
pub use manager::ToolManager;
pub use process::{Process, StartError};
pub use program::{LinkedProgram, Program, ProgramBuilder, ProviderKind, RuntimeParams};
pub use result::{ApiCallRecord, RunResult, StopCondition, ToolCallRecord};
pub use tools::ControlTool;

pub use llmproc_types::{
    ApiRequest, ApiResponse, ConfigError, ContentBlock, FdError, McpError, Message,
    ProviderClient, ProviderError, Role, RunError, StopReason, TokenUsage, ToolDefinition,
    ToolError, ToolResult,
};
