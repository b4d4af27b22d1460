//! Per-run telemetry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use llmproc_types::{ApiResponse, RunError, StopReason, TokenUsage, ToolResult};

/// Record of one provider API call within a run.
#[derive(Debug, Clone)]
pub struct ApiCallRecord {
    /// The model that served the call.
    pub model: String,
    /// Token usage for the call.
    pub usage: TokenUsage,
    /// Why the model stopped.
    pub stop_reason: StopReason,
}

/// Record of one tool call within a run.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// The tool name as the model called it.
    pub name: String,
    /// The arguments the model passed.
    pub args: serde_json::Value,
    /// The result appended to state (post auto-wrap).
    pub result: ToolResult,
    /// Wall-clock execution time.
    pub duration: Duration,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// The model finished normally.
    Completed,
    /// The iteration budget was exhausted.
    IterationLimit,
    /// The cumulative cost limit was exceeded.
    CostLimit,
    /// The run was cancelled cooperatively.
    Cancelled,
    /// A fatal provider error aborted the run.
    ProviderError,
}

/// Aggregated telemetry for one `run()` invocation.
///
/// Non-fatal failures never appear here; they are materialized into error
/// tool results inside the conversation. A fatal provider error sets
/// [`StopCondition::ProviderError`] and [`RunResult::error`]; the state is
/// left consistent either way.
#[derive(Debug)]
pub struct RunResult {
    api_calls: Vec<ApiCallRecord>,
    tool_calls: Vec<ToolCallRecord>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    usd_cost: Decimal,
    last_message: String,
    stop_condition: StopCondition,
    error: Option<RunError>,
}

impl RunResult {
    /// Start a new (in-flight) result.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_calls: Vec::new(),
            tool_calls: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            usd_cost: Decimal::ZERO,
            last_message: String::new(),
            stop_condition: StopCondition::Completed,
            error: None,
        }
    }

    /// Record a provider call.
    pub fn record_api_call(&mut self, response: &ApiResponse) {
        self.api_calls.push(ApiCallRecord {
            model: response.model.clone(),
            usage: response.usage.clone(),
            stop_reason: response.stop_reason,
        });
    }

    /// Record a tool call.
    pub fn record_tool_call(
        &mut self,
        name: &str,
        args: serde_json::Value,
        result: &ToolResult,
        duration: Duration,
    ) {
        self.tool_calls.push(ToolCallRecord {
            name: name.to_string(),
            args,
            result: result.clone(),
            duration,
        });
    }

    /// Add to the run's USD cost.
    pub fn add_cost(&mut self, cost: Decimal) {
        self.usd_cost += cost;
    }

    /// Mark the run finished.
    pub fn complete(&mut self, last_message: String, condition: StopCondition) {
        self.last_message = last_message;
        self.stop_condition = condition;
        self.finished_at = Some(Utc::now());
    }

    /// Mark the run aborted by a fatal error.
    pub fn fail(&mut self, last_message: String, error: RunError) {
        self.last_message = last_message;
        self.stop_condition = StopCondition::ProviderError;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }

    /// Per-API-call records, in order.
    #[must_use]
    pub fn api_calls(&self) -> &[ApiCallRecord] {
        &self.api_calls
    }

    /// Per-tool-call records, in order.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        &self.tool_calls
    }

    /// Total token usage across all API calls in this run.
    #[must_use]
    pub fn total_usage(&self) -> TokenUsage {
        let mut total = TokenUsage::default();
        for call in &self.api_calls {
            total.add(&call.usage);
        }
        total
    }

    /// Total USD cost, when pricing was derivable.
    #[must_use]
    pub fn usd_cost(&self) -> Decimal {
        self.usd_cost
    }

    /// The last assistant text of the run.
    #[must_use]
    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    /// Why the run stopped.
    #[must_use]
    pub fn stop_condition(&self) -> StopCondition {
        self.stop_condition
    }

    /// The fatal error, when the run aborted.
    #[must_use]
    pub fn error(&self) -> Option<&RunError> {
        self.error.as_ref()
    }

    /// Whether the run aborted on a fatal error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// When the run started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the run finished, if it has.
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Wall-clock duration, once finished.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.finished_at
            .and_then(|end| (end - self.started_at).to_std().ok())
    }
}

impl Default for RunResult {
    fn default() -> Self {
        Self::new()
    }
}
