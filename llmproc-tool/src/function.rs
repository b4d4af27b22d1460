//! Closure-backed tools.

use std::sync::Arc;

use llmproc_types::{BoxFuture, ToolDefinition, ToolError, ToolResult};

use crate::tool::{ToolCtx, ToolDyn};

type Handler = dyn Fn(serde_json::Value, ToolCtx) -> BoxFuture<'static, Result<ToolResult, ToolError>>
    + Send
    + Sync;

/// A tool built from an async closure plus a declared schema.
///
/// The schema is supplied (or adjusted) at construction time instead of
/// being derived from a typed argument struct, which suits tools assembled
/// from configuration. The handler receives the raw JSON input and an owned
/// context clone.
pub struct FunctionTool {
    definition: ToolDefinition,
    handler: Arc<Handler>,
}

impl FunctionTool {
    /// Create a tool from a name, description, input schema, and handler.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Value, ToolCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult, ToolError>> + Send + 'static,
    {
        Self {
            definition: ToolDefinition {
                name: name.into(),
                description: description.into(),
                input_schema,
            },
            handler: Arc::new(move |input, ctx| Box::pin(handler(input, ctx))),
        }
    }

    /// Override the description of one schema parameter.
    ///
    /// Explicit descriptions win over whatever the schema carried.
    #[must_use]
    pub fn with_param_description(mut self, param: &str, description: &str) -> Self {
        if let Some(prop) = self
            .definition
            .input_schema
            .get_mut("properties")
            .and_then(|props| props.get_mut(param))
            && let Some(obj) = prop.as_object_mut()
        {
            obj.insert(
                "description".into(),
                serde_json::Value::String(description.into()),
            );
        }
        self
    }
}

impl ToolDyn for FunctionTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolCtx,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        (self.handler)(input, ctx.clone())
    }
}
