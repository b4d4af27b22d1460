//! Provider executors and the driver loop.
//!
//! One `run(input)` is a sequence of awaited steps: assemble the payload,
//! call the provider, dispatch every tool use in order, append the results,
//! repeat. The loop itself is provider-independent; executors differ only
//! in payload shaping (wire format, cache markers, beta headers).

mod anthropic;
mod openai;
pub mod tokens;

use std::time::Instant;

pub use anthropic::AnthropicExecutor;
pub use openai::OpenAiExecutor;

use llmproc_types::{ApiRequest, Message, RunError, StopReason, ToolResult};

use crate::process::Process;
use crate::program::ProviderKind;
use crate::result::{RunResult, StopCondition};
use crate::tools;

/// Benign user turn injected when the payload would otherwise have no
/// messages (the Anthropic API rejects empty message lists).
pub(crate) const EMPTY_STATE_PROBE: &str = "(empty conversation)";

/// Shapes process state into one provider's wire payload.
pub trait ProcessExecutor: Send + Sync {
    /// Assemble the full request from current state. `with_cache` controls
    /// prompt-cache annotation; token counting always passes `false`.
    fn assemble(&self, process: &Process, with_cache: bool) -> ApiRequest;
}

static ANTHROPIC: AnthropicExecutor = AnthropicExecutor { vertex: false };
static ANTHROPIC_VERTEX: AnthropicExecutor = AnthropicExecutor { vertex: true };
static OPENAI: OpenAiExecutor = OpenAiExecutor;

/// The executor serving a provider kind.
pub(crate) fn executor_for(kind: ProviderKind) -> &'static dyn ProcessExecutor {
    match kind {
        ProviderKind::Anthropic => &ANTHROPIC,
        ProviderKind::AnthropicVertex => &ANTHROPIC_VERTEX,
        ProviderKind::OpenAi => &OPENAI,
    }
}

/// Drive one run to completion.
pub(crate) async fn drive(process: &mut Process, input: String) -> RunResult {
    let mut run = RunResult::new();
    let executor = executor_for(process.program.provider);

    let input = if process.program.fd_enabled() {
        process.fd_manager.maybe_wrap_user_input(input)
    } else {
        input
    };
    process.state.push(Message::user(input));

    let with_cache = !process.program.params.disable_automatic_caching;
    let max_iterations = process.program.params.max_iterations.max(1);
    let mut condition = StopCondition::IterationLimit;

    for iteration in 0..max_iterations {
        if process.cancellation.is_cancelled() {
            condition = StopCondition::Cancelled;
            break;
        }

        let request = executor.assemble(process, with_cache);
        let response = match process.client.create(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, iteration, "provider call failed, aborting run");
                run.fail(
                    process.last_message().unwrap_or_default(),
                    RunError::Provider(err),
                );
                extract_references(process);
                return run;
            }
        };

        run.record_api_call(&response);
        if let Some(cost) = process.record_api_usage(&response) {
            run.add_cost(cost);
        }
        process.state.push(response.message.clone());
        for hook in &process.hooks {
            hook.on_api_response(&response);
        }

        let tool_uses = response.message.tool_uses();
        if response.stop_reason != StopReason::ToolUse || tool_uses.is_empty() {
            condition = StopCondition::Completed;
            break;
        }

        // Dispatch the whole batch in order; one result per tool use.
        let mut results: Vec<(String, ToolResult)> = Vec::with_capacity(tool_uses.len());
        let mut cancelled_mid_batch = false;
        for (index, (id, name, args)) in tool_uses.iter().enumerate() {
            if process.cancellation.is_cancelled() {
                // Unfinished tool uses still need answers to keep the state
                // well-formed; synthesize error results for the rest.
                for (remaining_id, _, _) in &tool_uses[index..] {
                    results.push((
                        remaining_id.clone(),
                        ToolResult::error("cancelled before execution"),
                    ));
                }
                cancelled_mid_batch = true;
                break;
            }

            for hook in &process.hooks {
                hook.on_tool_start(name, args);
            }
            let started = Instant::now();
            let raw = tools::dispatch(process, name, args).await;
            let canonical = process.tools.resolve(name);
            let result = if process.program.fd_enabled() {
                process.fd_manager.maybe_wrap_tool_result(&canonical, raw)
            } else {
                raw
            };
            run.record_tool_call(name, args.clone(), &result, started.elapsed());
            for hook in &process.hooks {
                hook.on_tool_end(name, &result);
            }
            results.push((id.clone(), result));
        }

        if process.state_rewound {
            // goto discarded the tool-use turn; its results have no home.
            process.state_rewound = false;
            if cancelled_mid_batch {
                condition = StopCondition::Cancelled;
                break;
            }
            continue;
        }

        process.state.push(Message::tool_results(results));

        if cancelled_mid_batch {
            condition = StopCondition::Cancelled;
            break;
        }

        if let Some(limit) = process.program.params.cost_limit
            && process.total_cost >= limit
        {
            tracing::info!(cost = %process.total_cost, %limit, "cost limit reached");
            condition = StopCondition::CostLimit;
            break;
        }
    }

    extract_references(process);
    run.complete(process.last_message().unwrap_or_default(), condition);
    tracing::info!(
        api_calls = run.api_calls().len(),
        tool_calls = run.tool_calls().len(),
        condition = ?run.stop_condition(),
        "run finished"
    );
    run
}

/// Store `<ref id="…">` blocks from the last assistant text as labeled
/// descriptors. The text itself stays in state untouched.
fn extract_references(process: &mut Process) {
    if !process.program.fd_enabled() {
        return;
    }
    let Some(text) = process.last_message() else {
        return;
    };
    for (label, body) in llmproc_fd::extract_references(&text) {
        process.fd_manager.create_reference(&label, body);
    }
}
