//! Bridge MCP tools into the llmproc tool registry.

use std::sync::Arc;

use llmproc_tool::{ToolCtx, ToolDyn};
use llmproc_types::{BoxFuture, McpError, ToolDefinition, ToolError, ToolResult};

use crate::aggregator::McpAggregator;

/// Adapts one aggregated MCP tool to [`ToolDyn`].
///
/// The definition carries the prefixed name, so the bridge can be dropped
/// into a registry next to native tools.
pub struct McpToolBridge {
    aggregator: Arc<McpAggregator>,
    definition: ToolDefinition,
}

impl McpToolBridge {
    /// Create a bridge for one prefixed tool definition.
    #[must_use]
    pub fn new(aggregator: Arc<McpAggregator>, definition: ToolDefinition) -> Self {
        Self {
            aggregator,
            definition,
        }
    }
}

impl ToolDyn for McpToolBridge {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        _ctx: &'a ToolCtx,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            let arguments = match input {
                serde_json::Value::Object(map) => Some(map),
                serde_json::Value::Null => None,
                other => {
                    return Err(ToolError::InvalidInput(format!(
                        "expected object or null, got {other}"
                    )));
                }
            };
            match self.aggregator.call(&self.definition.name, arguments).await {
                Ok(result) => Ok(result),
                Err(McpError::Timeout(ceiling)) => Err(ToolError::Timeout(ceiling)),
                Err(err) => Err(ToolError::ExecutionFailed(err.to_string())),
            }
        })
    }
}

/// Discover all aggregated tools and wrap each in a bridge.
///
/// # Errors
///
/// Returns the first listing failure.
pub async fn bridges(aggregator: &Arc<McpAggregator>) -> Result<Vec<Arc<dyn ToolDyn>>, McpError> {
    let tools = aggregator.list_tools().await?;
    Ok(tools
        .into_iter()
        .map(|definition| {
            Arc::new(McpToolBridge::new(Arc::clone(aggregator), definition)) as Arc<dyn ToolDyn>
        })
        .collect())
}
