//! Tool registry: register, look up, and dispatch tools.

use std::collections::HashMap;
use std::sync::Arc;

use llmproc_types::{ToolDefinition, ToolError, ToolResult};

use crate::tool::{Tool, ToolCtx, ToolDyn};

/// Registry of tools available to a process.
///
/// Tools are stored as `Arc<dyn ToolDyn>` keyed by name. Dispatch is
/// failure-tolerant: unknown names and handler errors come back as error
/// tool results so the conversation survives and the model can
/// self-correct on its next turn.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strongly-typed tool. Overwrites any tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(T::NAME.to_string(), Arc::new(tool));
    }

    /// Register a pre-erased tool.
    pub fn register_dyn(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolDyn>> {
        self.tools.get(name).cloned()
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Definitions of all registered tools, sorted by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|tool| tool.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool strictly, propagating lookup and handler errors.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for an unknown name or whatever the
    /// handler produced.
    pub async fn call(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolCtx,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.call_dyn(input, ctx).await
    }

    /// Execute a tool, materializing every failure as an error tool result.
    ///
    /// An unknown name lists the available tools in the error content so
    /// the model can pick a valid one.
    pub async fn dispatch(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolCtx,
    ) -> ToolResult {
        match self.call(name, input, ctx).await {
            Ok(result) => result,
            Err(ToolError::NotFound(_)) => {
                tracing::warn!(tool = %name, "model called unknown tool");
                ToolResult::error(format!(
                    "Tool {name:?} not found. Available tools: {}",
                    self.names().join(", ")
                ))
            }
            Err(err) => {
                tracing::warn!(tool = %name, error = %err, "tool call failed");
                ToolResult::error(format!("Tool {name:?} failed: {err}"))
            }
        }
    }
}
