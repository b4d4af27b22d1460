//! Immutable compiled programs.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;

use llmproc_fd::FdConfig;
use llmproc_mcp::McpAggregator;
use llmproc_tool::ToolDyn;
use llmproc_types::ConfigError;

/// Names of the file-descriptor tools.
pub(crate) const FD_TOOL_NAMES: &[&str] = &["read_fd", "fd_to_file"];

/// Which provider family serves a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Direct Anthropic API.
    Anthropic,
    /// Anthropic models served through Vertex.
    AnthropicVertex,
    /// OpenAI chat completions.
    OpenAi,
}

impl ProviderKind {
    /// Parse a provider identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProvider`] for anything unrecognized.
    pub fn parse(identifier: &str) -> Result<Self, ConfigError> {
        match identifier {
            "anthropic" => Ok(Self::Anthropic),
            "anthropic_vertex" | "vertex" => Ok(Self::AnthropicVertex),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Provider-call parameters and run limits.
#[derive(Debug, Clone)]
pub struct RuntimeParams {
    /// Maximum tokens to generate per call.
    pub max_tokens: u64,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,
    /// Extended-thinking token budget (Anthropic family).
    pub thinking_budget: Option<u64>,
    /// Reasoning effort for o-family models (OpenAI).
    pub reasoning_effort: Option<String>,
    /// Disable automatic prompt-cache annotation.
    pub disable_automatic_caching: bool,
    /// Abort a run once cumulative USD cost reaches this.
    pub cost_limit: Option<Decimal>,
    /// Maximum driver-loop iterations per run.
    pub max_iterations: usize,
}

impl Default for RuntimeParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: None,
            top_p: None,
            thinking_budget: None,
            reasoning_effort: None,
            disable_automatic_caching: false,
            cost_limit: None,
            max_iterations: 10,
        }
    }
}

/// A program linked under a parent, with its human-readable description.
#[derive(Clone, Debug)]
pub struct LinkedProgram {
    /// The linked program.
    pub program: Arc<Program>,
    /// Description shown in spawn errors and tool schemas.
    pub description: String,
}

/// An immutable compiled configuration.
///
/// Programs are produced by [`ProgramBuilder::compile`], never mutated, and
/// shared read-only across forks and links.
pub struct Program {
    /// Model identifier sent to the provider.
    pub model: String,
    /// Which provider family serves this program.
    pub provider: ProviderKind,
    /// Base system prompt (before enrichment).
    pub system_prompt: String,
    /// Files whose contents enrich the system prompt at start.
    pub preload_files: Vec<PathBuf>,
    /// Enabled built-in and control tool names.
    pub builtin_tools: Vec<String>,
    /// Alias → canonical tool-name table.
    pub aliases: HashMap<String, String>,
    /// Function-derived tools registered as-is.
    pub function_tools: Vec<Arc<dyn ToolDyn>>,
    /// MCP aggregator, when external tool servers are configured.
    pub mcp: Option<Arc<McpAggregator>>,
    /// Linked programs reachable via spawn.
    pub linked: BTreeMap<String, LinkedProgram>,
    /// Provider parameters and run limits.
    pub params: RuntimeParams,
    /// Optional initial user prompt.
    pub user_prompt: Option<String>,
    /// Key/value pairs rendered into an `<env>` block of the enriched prompt.
    pub env_info: Vec<(String, String)>,
    /// File-descriptor system configuration; `None` disables it.
    pub fd: Option<FdConfig>,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("system_prompt", &self.system_prompt)
            .field("preload_files", &self.preload_files)
            .field("builtin_tools", &self.builtin_tools)
            .field("aliases", &self.aliases)
            .field("linked", &self.linked)
            .field("params", &self.params)
            .field("user_prompt", &self.user_prompt)
            .field("env_info", &self.env_info)
            .field("fd", &self.fd)
            .finish_non_exhaustive()
    }
}

impl Program {
    /// Start building a program.
    #[must_use]
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    /// Whether the file-descriptor system is enabled.
    #[must_use]
    pub fn fd_enabled(&self) -> bool {
        self.fd.is_some()
    }
}

/// Builder for [`Program`].
///
/// `compile` validates the configuration; invalid programs never reach
/// runtime.
#[derive(Default)]
pub struct ProgramBuilder {
    model: String,
    provider: String,
    system_prompt: String,
    preload_files: Vec<PathBuf>,
    builtin_tools: Vec<String>,
    aliases: HashMap<String, String>,
    function_tools: Vec<Arc<dyn ToolDyn>>,
    mcp: Option<Arc<McpAggregator>>,
    linked: BTreeMap<String, LinkedProgram>,
    params: RuntimeParams,
    user_prompt: Option<String>,
    env_info: Vec<(String, String)>,
    fd: Option<FdConfig>,
}

impl ProgramBuilder {
    /// Set the model id and provider identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>, provider: impl Into<String>) -> Self {
        self.model = model.into();
        self.provider = provider.into();
        self
    }

    /// Set the base system prompt.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Add files whose contents are preloaded into the enriched prompt.
    #[must_use]
    pub fn preload_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.preload_files.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Enable built-in and control tools by name.
    #[must_use]
    pub fn builtin_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builtin_tools.extend(names.into_iter().map(Into::into));
        self
    }

    /// Expose a tool under an alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), canonical.into());
        self
    }

    /// Register a function-derived tool.
    #[must_use]
    pub fn function_tool(mut self, tool: Arc<dyn ToolDyn>) -> Self {
        self.function_tools.push(tool);
        self
    }

    /// Attach an MCP aggregator.
    #[must_use]
    pub fn mcp(mut self, aggregator: Arc<McpAggregator>) -> Self {
        self.mcp = Some(aggregator);
        self
    }

    /// Link another program under `name`.
    #[must_use]
    pub fn link(
        mut self,
        name: impl Into<String>,
        program: Arc<Program>,
        description: impl Into<String>,
    ) -> Self {
        self.linked.insert(
            name.into(),
            LinkedProgram {
                program,
                description: description.into(),
            },
        );
        self
    }

    /// Set the runtime parameters wholesale.
    #[must_use]
    pub fn params(mut self, params: RuntimeParams) -> Self {
        self.params = params;
        self
    }

    /// Set the iteration budget.
    #[must_use]
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.params.max_iterations = max;
        self
    }

    /// Set the initial user prompt.
    #[must_use]
    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.user_prompt = Some(prompt.into());
        self
    }

    /// Add an environment-info pair for the enriched prompt.
    #[must_use]
    pub fn env_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_info.push((key.into(), value.into()));
        self
    }

    /// Enable the file-descriptor system.
    #[must_use]
    pub fn fd(mut self, config: FdConfig) -> Self {
        self.fd = Some(config);
        self
    }

    /// Validate and freeze the program.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on a missing model, unknown provider, FD
    /// tools without the FD system, an oversized thinking budget, or a
    /// linked-program cycle.
    pub fn compile(mut self) -> Result<Arc<Program>, ConfigError> {
        if self.model.is_empty() {
            return Err(ConfigError::MissingField("model"));
        }
        let provider = ProviderKind::parse(&self.provider)?;

        // FD tools only make sense with the FD system on.
        if self.fd.is_none() {
            for name in FD_TOOL_NAMES {
                if self.builtin_tools.iter().any(|tool| tool == name) {
                    return Err(ConfigError::FdToolsDisabled((*name).to_string()));
                }
            }
        }

        // With the FD system on but neither FD tool listed, enable both.
        if self.fd.is_some()
            && !self
                .builtin_tools
                .iter()
                .any(|tool| FD_TOOL_NAMES.contains(&tool.as_str()))
        {
            tracing::warn!("file descriptor system enabled without FD tools, auto-enabling both");
            self.builtin_tools
                .extend(FD_TOOL_NAMES.iter().map(|name| (*name).to_string()));
        }

        if let Some(budget) = self.params.thinking_budget {
            if budget >= self.params.max_tokens {
                return Err(ConfigError::ThinkingBudget {
                    budget,
                    max_tokens: self.params.max_tokens,
                });
            }
            // Thinking is incompatible with sampling controls; drop them.
            if self.params.temperature.is_some() || self.params.top_p.is_some() {
                tracing::warn!("thinking enabled, dropping temperature/top_p");
                self.params.temperature = None;
                self.params.top_p = None;
            }
        }

        let program = Arc::new(Program {
            model: self.model,
            provider,
            system_prompt: self.system_prompt,
            preload_files: self.preload_files,
            builtin_tools: self.builtin_tools,
            aliases: self.aliases,
            function_tools: self.function_tools,
            mcp: self.mcp,
            linked: self.linked,
            params: self.params,
            user_prompt: self.user_prompt,
            env_info: self.env_info,
            fd: self.fd,
        });

        check_link_cycles(&program)?;
        Ok(program)
    }
}

/// Reject linked-program graphs with cycles.
///
/// Links are followed depth-first; revisiting a program already on the
/// current path is a cycle. Diamonds (one program linked twice) are fine.
fn check_link_cycles(root: &Arc<Program>) -> Result<(), ConfigError> {
    fn walk(
        program: &Arc<Program>,
        name: &str,
        path: &mut Vec<*const Program>,
    ) -> Result<(), ConfigError> {
        let ptr = Arc::as_ptr(program);
        if path.contains(&ptr) {
            return Err(ConfigError::LinkedProgramCycle(name.to_string()));
        }
        path.push(ptr);
        for (child_name, link) in &program.linked {
            walk(&link.program, child_name, path)?;
        }
        path.pop();
        Ok(())
    }
    walk(root, "<root>", &mut Vec::new())
}
