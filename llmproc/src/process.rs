//! Live process instances.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use llmproc_fd::{FdConfig, FdManager};
use llmproc_tool::ToolCtx;
use llmproc_types::{
    ApiResponse, ConfigError, McpError, Message, ProviderClient, ProviderError, TokenUsage,
};

use crate::callbacks::RunHook;
use crate::cost::CostModel;
use crate::executor;
use crate::executor::tokens::TokenCount;
use crate::manager::ToolManager;
use crate::program::Program;
use crate::result::RunResult;

/// Errors from instantiating a process.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// Program-level failure (unreadable preload file).
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// MCP tool discovery failed.
    #[error("mcp initialization failed: {0}")]
    Mcp(#[from] McpError),
}

impl Program {
    /// Instantiate this program as a new process.
    ///
    /// Reads preload files, computes the enriched system prompt (cached for
    /// the process lifetime), and builds the tool set, including MCP
    /// discovery.
    ///
    /// # Errors
    ///
    /// Returns [`StartError`] when a preload file is unreadable or MCP
    /// discovery fails.
    pub async fn start(
        self: &Arc<Self>,
        client: Arc<dyn ProviderClient>,
    ) -> Result<Process, StartError> {
        let enriched_system = enrich_system_prompt(self).await?;
        let tools = ToolManager::initialize(self).await?;
        let cancellation = CancellationToken::new();
        let tool_ctx = ToolCtx {
            environment: self.env_info.iter().cloned().collect(),
            cancellation_token: cancellation.clone(),
            ..ToolCtx::default()
        };

        Ok(Process {
            program: Arc::clone(self),
            client,
            state: Vec::new(),
            enriched_system,
            fd_manager: FdManager::new(self.fd.clone().unwrap_or_else(FdConfig::default)),
            tools,
            linked_instances: HashMap::new(),
            fork_enabled: true,
            state_rewound: false,
            cancellation,
            hooks: Vec::new(),
            total_usage: TokenUsage::default(),
            total_cost: Decimal::ZERO,
            cost_model: CostModel::default(),
            tool_ctx,
        })
    }
}

/// Compute the enriched system prompt: base prompt, preloaded file
/// contents, and the environment-info block.
async fn enrich_system_prompt(program: &Program) -> Result<String, ConfigError> {
    let mut enriched = program.system_prompt.clone();

    if !program.preload_files.is_empty() {
        let mut block = String::from("<preload>\n");
        for path in &program.preload_files {
            let content =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Preload {
                        path: path.clone(),
                        source,
                    })?;
            block.push_str(&format!(
                "<file path=\"{}\">\n{content}\n</file>\n",
                path.display()
            ));
        }
        block.push_str("</preload>");
        enriched.push_str("\n\n");
        enriched.push_str(&block);
    }

    if !program.env_info.is_empty() {
        enriched.push_str("\n\n<env>\n");
        for (key, value) in &program.env_info {
            enriched.push_str(&format!("{key}: {value}\n"));
        }
        enriched.push_str("</env>");
    }

    Ok(enriched)
}

/// A running instance of a [`Program`].
///
/// Owns its conversation state, descriptor store, and tool bindings
/// exclusively; linked child processes are instantiated lazily and live in
/// the parent's table. One process serializes its own runs, since `run` takes
/// `&mut self`.
pub struct Process {
    pub(crate) program: Arc<Program>,
    pub(crate) client: Arc<dyn ProviderClient>,
    pub(crate) state: Vec<Message>,
    pub(crate) enriched_system: String,
    pub(crate) fd_manager: FdManager,
    pub(crate) tools: ToolManager,
    pub(crate) linked_instances: HashMap<String, Process>,
    pub(crate) fork_enabled: bool,
    /// Set by `goto` when it truncates state mid-batch; tells the driver
    /// not to append tool results for the rewound batch.
    pub(crate) state_rewound: bool,
    pub(crate) cancellation: CancellationToken,
    pub(crate) hooks: Vec<Arc<dyn RunHook>>,
    pub(crate) total_usage: TokenUsage,
    pub(crate) total_cost: Decimal,
    pub(crate) cost_model: CostModel,
    pub(crate) tool_ctx: ToolCtx,
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("state", &self.state)
            .field("fork_enabled", &self.fork_enabled)
            .field("state_rewound", &self.state_rewound)
            .field("total_usage", &self.total_usage)
            .field("total_cost", &self.total_cost)
            .finish_non_exhaustive()
    }
}

impl Process {
    /// The program this process runs.
    #[must_use]
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// The conversation state.
    #[must_use]
    pub fn state(&self) -> &[Message] {
        &self.state
    }

    /// The enriched system prompt (base + preload + env block).
    #[must_use]
    pub fn enriched_system(&self) -> &str {
        &self.enriched_system
    }

    /// The descriptor store.
    #[must_use]
    pub fn fd_manager(&self) -> &FdManager {
        &self.fd_manager
    }

    /// The tool surface.
    #[must_use]
    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    /// Whether this process may fork.
    #[must_use]
    pub fn fork_enabled(&self) -> bool {
        self.fork_enabled
    }

    /// Cumulative token usage across all runs of this process.
    #[must_use]
    pub fn total_usage(&self) -> &TokenUsage {
        &self.total_usage
    }

    /// Cumulative USD cost across all runs of this process.
    #[must_use]
    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    /// Replace the cost model.
    pub fn set_cost_model(&mut self, model: CostModel) {
        self.cost_model = model;
    }

    /// Register a run hook.
    pub fn add_hook(&mut self, hook: Arc<dyn RunHook>) {
        self.hooks.push(hook);
    }

    /// The token cancelling this process's runs.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Drive one exchange with the model to completion.
    ///
    /// Appends `input` as a user message, then iterates `API call → tool
    /// dispatch → state update` until the model stops calling tools or an
    /// iteration/cost limit trips. Fatal provider errors are reported on
    /// the result; tool-level failures stay inside the conversation.
    pub async fn run(&mut self, input: &str) -> RunResult {
        executor::drive(self, input.to_string()).await
    }

    /// Run the program's declared initial user prompt.
    ///
    /// A program without one returns an empty completed result.
    pub async fn run_initial(&mut self) -> RunResult {
        match self.program.user_prompt.clone() {
            Some(prompt) => self.run(&prompt).await,
            None => {
                let mut result = RunResult::new();
                result.complete(String::new(), crate::result::StopCondition::Completed);
                result
            }
        }
    }

    /// Count the input tokens the next API call would send.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider has no counting endpoint
    /// or the call fails.
    pub async fn count_tokens(&self) -> Result<TokenCount, ProviderError> {
        executor::tokens::count_tokens(self).await
    }

    /// The text of the last assistant message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<String> {
        self.state
            .iter()
            .rev()
            .find(|message| message.role == llmproc_types::Role::Assistant)
            .map(Message::text)
    }

    /// Produce an independent child for `fork`.
    ///
    /// State and descriptors are deep-copied; the child shares the program
    /// and provider client handles, starts with fresh counters and an empty
    /// linked table, and may not fork further.
    #[must_use]
    pub fn fork_process(&self) -> Process {
        Process {
            program: Arc::clone(&self.program),
            client: Arc::clone(&self.client),
            state: self.state.clone(),
            enriched_system: self.enriched_system.clone(),
            fd_manager: self.fd_manager.deep_copy(),
            tools: self.tools.clone(),
            linked_instances: HashMap::new(),
            fork_enabled: false,
            state_rewound: false,
            cancellation: self.cancellation.clone(),
            hooks: self.hooks.clone(),
            total_usage: TokenUsage::default(),
            total_cost: Decimal::ZERO,
            cost_model: self.cost_model.clone(),
            tool_ctx: self.tool_ctx.clone(),
        }
    }

    /// Append a spawn-time preload block to the enriched prompt.
    pub(crate) fn append_enrichment(&mut self, block: &str) {
        self.enriched_system.push_str("\n\n");
        self.enriched_system.push_str(block);
    }

    /// Fold one API call into the cumulative counters; returns its cost
    /// when pricing is known.
    pub(crate) fn record_api_usage(&mut self, response: &ApiResponse) -> Option<Decimal> {
        self.total_usage.add(&response.usage);
        let cost = self.cost_model.cost_of(&response.model, &response.usage);
        if let Some(cost) = cost {
            self.total_cost += cost;
        }
        cost
    }
}
