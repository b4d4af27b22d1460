//! Control tools: process primitives the model itself can call.
//!
//! Unlike registry tools, these need the whole process: fork deep-copies
//! it, spawn drives linked children, goto rewrites state, and the FD tools
//! touch the descriptor store. The kernel dispatches them here with full
//! access; everything else goes through the registry.

mod fd_tools;
mod fork;
mod goto;
mod spawn;

use llmproc_types::{ToolDefinition, ToolResult};

use crate::process::Process;
use crate::program::Program;

/// The control tools a program may enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTool {
    /// Deep-copy the process and run each prompt in an independent child.
    Fork,
    /// Run a linked program with a query.
    Spawn,
    /// Rewind conversation state to an earlier message.
    Goto,
    /// Read a slice of a file descriptor.
    ReadFd,
    /// Export a file descriptor to disk.
    FdToFile,
}

impl ControlTool {
    /// Look up a control tool by canonical name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fork" => Some(Self::Fork),
            "spawn" => Some(Self::Spawn),
            "goto" => Some(Self::Goto),
            "read_fd" => Some(Self::ReadFd),
            "fd_to_file" => Some(Self::FdToFile),
            _ => None,
        }
    }

    /// The canonical name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fork => "fork",
            Self::Spawn => "spawn",
            Self::Goto => "goto",
            Self::ReadFd => "read_fd",
            Self::FdToFile => "fd_to_file",
        }
    }

    /// The definition exposed to the model.
    #[must_use]
    pub fn definition(&self, program: &Program) -> ToolDefinition {
        match self {
            Self::Fork => fork::definition(),
            Self::Spawn => spawn::definition(program),
            Self::Goto => goto::definition(),
            Self::ReadFd => fd_tools::read_fd_definition(),
            Self::FdToFile => fd_tools::fd_to_file_definition(),
        }
    }
}

/// Dispatch one model tool call.
///
/// Resolves aliases, routes control tools to the kernel implementations,
/// and forwards the rest to the registry. Never fails: every error becomes
/// an error tool result so the run continues.
pub(crate) async fn dispatch(
    process: &mut Process,
    called_name: &str,
    input: &serde_json::Value,
) -> ToolResult {
    let canonical = process.tools.resolve(called_name);

    if let Some(tool) = process.tools.control_tool(&canonical) {
        return match tool {
            ControlTool::Fork => fork::run(process, input).await,
            ControlTool::Spawn => spawn::run(process, input).await,
            ControlTool::Goto => goto::run(process, input),
            ControlTool::ReadFd => fd_tools::read_fd(process, input),
            ControlTool::FdToFile => fd_tools::fd_to_file(process, input).await,
        };
    }

    if process.tools.has_registered(&canonical) {
        match process
            .tools
            .call_registry(&canonical, input.clone(), &process.tool_ctx)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(tool = %called_name, error = %err, "tool call failed");
                ToolResult::error(format!("Tool {called_name:?} failed: {err}"))
            }
        }
    } else {
        tracing::warn!(tool = %called_name, "model called unknown tool");
        ToolResult::error(format!(
            "Tool {called_name:?} not found. Available tools: {}",
            process.tools.exposed_names(&process.program).join(", ")
        ))
    }
}
