//! The tool traits: typed [`Tool`] and object-safe [`ToolDyn`].

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use llmproc_types::{BoxFuture, ToolDefinition, ToolError, ToolResult};

/// Execution context handed to every tool call.
#[derive(Debug, Clone)]
pub struct ToolCtx {
    /// Working directory for relative paths.
    pub cwd: PathBuf,
    /// Environment variables visible to the tool.
    pub environment: HashMap<String, String>,
    /// Token for cooperative cancellation.
    pub cancellation_token: CancellationToken,
}

impl Default for ToolCtx {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/tmp")),
            environment: HashMap::new(),
            cancellation_token: CancellationToken::new(),
        }
    }
}

/// A strongly-typed tool.
///
/// Arguments are declared as a deserializable, schema-deriving type; the
/// runtime coerces the model's JSON arguments through serde and rejects
/// mismatches as [`ToolError::InvalidInput`] before the handler runs.
pub trait Tool: Send + Sync {
    /// The tool's unique name.
    const NAME: &'static str;
    /// Typed arguments, coerced from the model's JSON input.
    type Args: DeserializeOwned + schemars::JsonSchema + Send;
    /// Successful output, serialized into the tool-result content.
    type Output: Serialize;
    /// Handler error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// The definition exposed to the model. The default derives the input
    /// schema from `Args`.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: self.description().into(),
            input_schema: serde_json::to_value(schemars::schema_for!(Self::Args))
                .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
        }
    }

    /// Execute the tool.
    fn call(
        &self,
        args: Self::Args,
        ctx: &ToolCtx,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Object-safe tool abstraction.
///
/// Any tool source (typed tool, closure, MCP server) erases to this trait
/// and is stored as `Arc<dyn ToolDyn>` in a registry.
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;

    /// The definition exposed to the model.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with raw JSON input.
    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolCtx,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>>;
}

impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolCtx,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            let args: T::Args = serde_json::from_value(input)
                .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
            let output = self
                .call(args, ctx)
                .await
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
            Ok(ToolResult::ok(render_output(&output)?))
        })
    }
}

/// Serialize a tool output into result content. Bare strings are passed
/// through unquoted; everything else becomes compact JSON.
fn render_output<T: Serialize>(output: &T) -> Result<String, ToolError> {
    let value =
        serde_json::to_value(output).map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    struct Upper;

    #[derive(Debug, Deserialize, schemars::JsonSchema)]
    struct UpperArgs {
        text: String,
    }

    impl Tool for Upper {
        const NAME: &'static str = "upper";
        type Args = UpperArgs;
        type Output = String;
        type Error = std::io::Error;

        fn description(&self) -> &str {
            "Uppercases text"
        }

        async fn call(&self, args: UpperArgs, _ctx: &ToolCtx) -> Result<String, std::io::Error> {
            Ok(args.text.to_uppercase())
        }
    }

    #[tokio::test]
    async fn typed_tool_erases_to_dyn() {
        let tool = Upper;
        let dyn_tool: &dyn ToolDyn = &tool;
        assert_eq!(dyn_tool.name(), "upper");

        let ctx = ToolCtx::default();
        let result = dyn_tool
            .call_dyn(serde_json::json!({"text": "hi"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content, "HI");
    }

    #[tokio::test]
    async fn mismatched_args_are_invalid_input() {
        let tool = Upper;
        let ctx = ToolCtx::default();
        let err = ToolDyn::call_dyn(&tool, serde_json::json!({"text": 7}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn definition_derives_schema_from_args() {
        let def = Tool::definition(&Upper);
        assert_eq!(def.name, "upper");
        let schema = def.input_schema;
        assert_eq!(schema["properties"]["text"]["type"], "string");
    }

    #[test]
    fn structured_output_renders_as_json() {
        #[derive(Serialize)]
        struct Out {
            n: u32,
        }
        assert_eq!(render_output(&Out { n: 4 }).unwrap(), "{\"n\":4}");
        assert_eq!(render_output(&"plain").unwrap(), "plain");
    }
}
