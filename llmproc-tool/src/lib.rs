#![deny(missing_docs)]
//! Tool interface and registry for llmproc.
//!
//! Defines the object-safe [`ToolDyn`] trait, the typed [`Tool`] trait with
//! schema derivation and argument coercion, the [`FunctionTool`] closure
//! adapter, and the [`ToolRegistry`] that dispatches model tool calls with
//! graceful error recovery.

pub mod builtin;
mod function;
mod registry;
mod tool;

pub use function::FunctionTool;
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolCtx, ToolDyn};

pub use llmproc_types::ToolError;
