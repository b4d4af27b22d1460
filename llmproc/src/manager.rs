//! Composition of the per-process tool set.

use std::collections::HashMap;
use std::sync::Arc;

use llmproc_mcp::bridges;
use llmproc_tool::builtin::register_builtin;
use llmproc_tool::{ToolCtx, ToolRegistry};
use llmproc_types::{McpError, ToolDefinition, ToolError, ToolResult};

use crate::program::Program;
use crate::tools::ControlTool;

/// The tool surface bound to one process.
///
/// Composes built-ins, function-derived tools, and MCP bridges into one
/// registry, tracks which control tools are enabled, and resolves aliases
/// before dispatch. Control tools are not in the registry: they need the
/// whole process and are dispatched by the kernel (see `tools::dispatch`).
#[derive(Clone, Default)]
pub struct ToolManager {
    registry: ToolRegistry,
    /// alias → canonical.
    aliases: HashMap<String, String>,
    /// canonical → alias, for renaming published definitions.
    exposed_as: HashMap<String, String>,
    control: Vec<ControlTool>,
}

impl ToolManager {
    /// Build the tool set a program declares.
    ///
    /// Only enabled tools are registered; everything the model can see goes
    /// through here. MCP discovery runs once, at process start.
    ///
    /// # Errors
    ///
    /// Returns [`McpError`] when MCP tool discovery fails.
    pub(crate) async fn initialize(program: &Program) -> Result<Self, McpError> {
        let mut registry = ToolRegistry::new();
        let mut control = Vec::new();

        for name in &program.builtin_tools {
            if let Some(tool) = ControlTool::from_name(name) {
                if tool == ControlTool::Spawn && program.linked.is_empty() {
                    // Spawn without linked programs can never succeed.
                    tracing::warn!("spawn enabled without linked programs, leaving it inert");
                    continue;
                }
                if !control.contains(&tool) {
                    control.push(tool);
                }
            } else if !register_builtin(name, &mut registry) {
                tracing::warn!(tool = %name, "unknown builtin tool, skipping");
            }
        }

        for tool in &program.function_tools {
            registry.register_dyn(Arc::clone(tool));
        }

        if let Some(aggregator) = &program.mcp {
            for bridge in bridges(aggregator).await? {
                registry.register_dyn(bridge);
            }
        }

        let aliases = program.aliases.clone();
        let exposed_as = aliases
            .iter()
            .map(|(alias, canonical)| (canonical.clone(), alias.clone()))
            .collect();

        Ok(Self {
            registry,
            aliases,
            exposed_as,
            control,
        })
    }

    /// Resolve an alias to its canonical tool name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Whether a canonical name is an enabled control tool.
    #[must_use]
    pub(crate) fn control_tool(&self, canonical: &str) -> Option<ControlTool> {
        ControlTool::from_name(canonical).filter(|tool| self.control.contains(tool))
    }

    /// The definitions exposed to the model: enabled control tools plus the
    /// registry, with aliased tools published under their alias.
    #[must_use]
    pub fn definitions(&self, program: &Program) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .control
            .iter()
            .map(|tool| tool.definition(program))
            .collect();
        defs.extend(self.registry.definitions());
        for def in &mut defs {
            if let Some(alias) = self.exposed_as.get(&def.name) {
                def.name = alias.clone();
            }
        }
        defs
    }

    /// All names the model may call (aliases applied), sorted.
    #[must_use]
    pub fn exposed_names(&self, program: &Program) -> Vec<String> {
        let mut names: Vec<String> = self
            .definitions(program)
            .into_iter()
            .map(|def| def.name)
            .collect();
        names.sort();
        names
    }

    /// Dispatch a non-control tool through the registry.
    pub(crate) async fn call_registry(
        &self,
        canonical: &str,
        input: serde_json::Value,
        ctx: &ToolCtx,
    ) -> Result<ToolResult, ToolError> {
        self.registry.call(canonical, input, ctx).await
    }

    /// Whether the registry holds `canonical`.
    #[must_use]
    pub(crate) fn has_registered(&self, canonical: &str) -> bool {
        self.registry.get(canonical).is_some()
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}
