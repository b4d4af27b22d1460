//! Integration tests for the process kernel and driver loop, driven by a
//! scripted provider client.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use llmproc::{
    ApiRequest, ApiResponse, ContentBlock, CostModel, Message, Process, Program, ProviderClient,
    ProviderError, Role, RunResult, RuntimeParams, StopCondition, StopReason, TokenUsage,
    ToolResult,
};
use llmproc_fd::FdConfig;
use llmproc_tool::FunctionTool;
use llmproc_types::BoxFuture;
use rust_decimal::Decimal;
use serde_json::json;

/// A provider client that replays scripted responses and captures every
/// request for inspection.
struct MockClient {
    responses: Mutex<VecDeque<ApiResponse>>,
    requests: Mutex<Vec<ApiRequest>>,
    cancel_after_create: Mutex<Option<tokio_util::sync::CancellationToken>>,
    counted_tokens: u64,
}

impl MockClient {
    fn new(responses: Vec<ApiResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            cancel_after_create: Mutex::new(None),
            counted_tokens: 42,
        })
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("test lock poisoned").clone()
    }

    /// Cancel `token` as a side effect of the next `create`, landing the
    /// cancellation between the API response and tool execution.
    fn cancel_after_create(&self, token: tokio_util::sync::CancellationToken) {
        *self.cancel_after_create.lock().expect("test lock poisoned") = Some(token);
    }
}

impl ProviderClient for MockClient {
    fn create(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ProviderError>> {
        self.requests
            .lock()
            .expect("test lock poisoned")
            .push(request);
        if let Some(token) = self
            .cancel_after_create
            .lock()
            .expect("test lock poisoned")
            .take()
        {
            token.cancel();
        }
        let next = self
            .responses
            .lock()
            .expect("test lock poisoned")
            .pop_front();
        Box::pin(async move {
            next.ok_or_else(|| ProviderError::InvalidRequest("mock script exhausted".into()))
        })
    }

    fn count_tokens(&self, request: ApiRequest) -> BoxFuture<'_, Result<u64, ProviderError>> {
        self.requests
            .lock()
            .expect("test lock poisoned")
            .push(request);
        let tokens = self.counted_tokens;
        Box::pin(async move { Ok(tokens) })
    }
}

fn text_response(text: &str) -> ApiResponse {
    ApiResponse {
        id: "msg_test".into(),
        model: "claude-sonnet-4-20250514".into(),
        message: Message::assistant(text),
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
            ..TokenUsage::default()
        },
    }
}

fn tool_use_response(calls: Vec<(&str, &str, serde_json::Value)>) -> ApiResponse {
    ApiResponse {
        id: "msg_test".into(),
        model: "claude-sonnet-4-20250514".into(),
        message: Message {
            role: Role::Assistant,
            content: calls
                .into_iter()
                .map(|(id, name, input)| ContentBlock::ToolUse {
                    id: id.into(),
                    name: name.into(),
                    input,
                })
                .collect(),
        },
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
            ..TokenUsage::default()
        },
    }
}

async fn start(program: Arc<Program>, client: Arc<MockClient>) -> Process {
    program.start(client).await.expect("process starts")
}

/// Every ToolUse in an assistant message must be answered, in order, by the
/// next user message.
fn assert_tool_pairing(state: &[Message]) {
    for (index, message) in state.iter().enumerate() {
        if message.role != Role::Assistant {
            continue;
        }
        let uses = message.tool_uses();
        if uses.is_empty() {
            continue;
        }
        let next = state
            .get(index + 1)
            .unwrap_or_else(|| panic!("tool uses at {index} have no following message"));
        assert_eq!(next.role, Role::User);
        let result_ids: Vec<&str> = next
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect();
        let use_ids: Vec<&str> = uses.iter().map(|(id, _, _)| id.as_str()).collect();
        assert_eq!(result_ids, use_ids, "result order must match use order");
    }
}

#[test]
fn process_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Process>();
}

// --- Scenario: basic echo ---

#[tokio::test]
async fn basic_echo() {
    let program = Program::builder()
        .model("claude-haiku-4-5", "anthropic")
        .system_prompt("You are terse.")
        .compile()
        .unwrap();
    let client = MockClient::new(vec![text_response("hi")]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("Say hi.").await;

    assert_eq!(result.api_calls().len(), 1);
    assert_eq!(result.api_calls()[0].stop_reason, StopReason::EndTurn);
    assert_eq!(result.last_message(), "hi");
    assert_eq!(result.stop_condition(), StopCondition::Completed);
    assert!(result.duration().is_some());
}

// --- Scenario: tool round trip ---

#[tokio::test]
async fn calculator_round_trip() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["calculator"])
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![("tu_1", "calculator", json!({"expression": "2+2"}))]),
        text_response("The answer is 4."),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("What is 2+2? Use the tool.").await;

    assert!(result.api_calls().len() >= 2);
    assert_eq!(result.tool_calls().len(), 1);
    assert_eq!(result.tool_calls()[0].name, "calculator");
    assert_eq!(result.tool_calls()[0].result.content, "4");
    assert!(result.last_message().contains('4'));

    // State: user, assistant(tool_use), user(tool_result), assistant.
    let state = process.state();
    assert_eq!(state.len(), 4);
    assert_tool_pairing(state);
    match &state[2].content[0] {
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            assert_eq!(tool_use_id, "tu_1");
            assert_eq!(content, "4");
            assert!(!is_error);
        }
        other => panic!("expected tool result, got {other:?}"),
    }
}

// --- Scenario: multiple tool uses answered in order ---

#[tokio::test]
async fn batch_results_preserve_order() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["calculator"])
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![
            ("tu_a", "calculator", json!({"expression": "1+1"})),
            ("tu_b", "calculator", json!({"expression": "2+2"})),
            ("tu_c", "calculator", json!({"expression": "3+3"})),
        ]),
        text_response("done"),
    ]);
    let mut process = start(program, client.clone()).await;

    process.run("compute").await;

    assert_tool_pairing(process.state());
    let results: Vec<String> = process.state()[2]
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::ToolResult { content, .. } => content.clone(),
            other => panic!("expected tool result, got {other:?}"),
        })
        .collect();
    assert_eq!(results, vec!["2", "4", "6"]);
}

// --- Scenario: auto-FD wrap ---

#[tokio::test]
async fn oversized_tool_result_wraps_into_fd() {
    let dump = FunctionTool::new(
        "dump",
        "Dumps a lot of text",
        json!({"type": "object", "properties": {}}),
        |_input, _ctx| async move { Ok(ToolResult::ok("x".repeat(20_000))) },
    );
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .function_tool(Arc::new(dump))
        .fd(FdConfig {
            page_size: 4000,
            max_direct_output_chars: 8000,
            ..FdConfig::default()
        })
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![("tu_1", "dump", json!({}))]),
        text_response("stored"),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("dump it").await;

    let wrapped = &result.tool_calls()[0].result;
    assert!(!wrapped.is_error);
    assert!(wrapped.content.starts_with("<fd_result fd=\"fd:1\" pages=\"5\""));
    assert!(wrapped.content.contains("total_lines=\"1\""));
    // Preview is the first page.
    assert!(wrapped.content.contains(&"x".repeat(4000)));
    assert!(!wrapped.content.contains(&"x".repeat(4001)));

    let fd = process.fd_manager().get("fd:1").unwrap();
    assert_eq!(fd.total_pages(), 5);
    assert_eq!(fd.total_lines(), 1);
}

#[tokio::test]
async fn fd_tools_can_read_back_wrapped_content() {
    let dump = FunctionTool::new(
        "dump",
        "Dumps numbered lines",
        json!({"type": "object", "properties": {}}),
        |_input, _ctx| async move {
            let content: String = (1..=210).map(|i| format!("line {i:03} padded\n")).collect();
            Ok(ToolResult::ok(content))
        },
    );
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .function_tool(Arc::new(dump))
        .fd(FdConfig {
            page_size: 1000,
            max_direct_output_chars: 2000,
            ..FdConfig::default()
        })
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![("tu_1", "dump", json!({}))]),
        tool_use_response(vec![(
            "tu_2",
            "read_fd",
            json!({"fd": "fd:1", "mode": "line", "start": 50, "count": 3, "extract_to_new_fd": true}),
        )]),
        tool_use_response(vec![("tu_3", "read_fd", json!({"fd": "fd:2", "read_all": true}))]),
        text_response("done"),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("dump and slice").await;

    // Extraction returned the new descriptor id only.
    assert!(result.tool_calls()[1]
        .result
        .content
        .contains("new_fd=\"fd:2\""));
    // Reading it back yields exactly lines 50..52.
    let read_back = &result.tool_calls()[2].result.content;
    assert!(read_back.contains("line 050 padded"));
    assert!(read_back.contains("line 052 padded"));
    assert!(!read_back.contains("line 053 padded"));
    assert_tool_pairing(process.state());
}

#[tokio::test]
async fn page_beyond_range_is_recovered_fd_error() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .fd(FdConfig::default())
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![("tu_1", "read_fd", json!({"fd": "fd:9"}))]),
        text_response("recovered"),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("read").await;

    let error = &result.tool_calls()[0].result;
    assert!(error.is_error);
    assert!(error.content.contains("<fd_error type=\"not_found\" fd=\"fd:9\">"));
    assert_eq!(result.stop_condition(), StopCondition::Completed);
}

// --- Scenario: fork ---

#[tokio::test]
async fn fork_runs_children_and_collects_replies() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["fork"])
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![(
            "tu_1",
            "fork",
            json!({"prompts": ["count to 3", "count to 5"]}),
        )]),
        text_response("1 2 3"),
        text_response("1 2 3 4 5"),
        text_response("both children finished"),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("fork and count").await;

    let fork_result = &result.tool_calls()[0].result;
    assert!(!fork_result.is_error);
    let replies: Vec<String> = serde_json::from_str(&fork_result.content).unwrap();
    assert_eq!(replies, vec!["1 2 3", "1 2 3 4 5"]);
    assert_eq!(result.last_message(), "both children finished");
    // Parent state unaffected by child runs beyond the tool result.
    assert_tool_pairing(process.state());
}

#[tokio::test]
async fn fork_inside_child_is_denied() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["fork"])
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        // Parent forks once.
        tool_use_response(vec![("tu_1", "fork", json!({"prompts": ["go deeper"]}))]),
        // The child tries to fork again, then recovers.
        tool_use_response(vec![("tu_2", "fork", json!({"prompts": ["deeper still"]}))]),
        text_response("child gave up"),
        text_response("parent done"),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("fork").await;

    assert_eq!(result.last_message(), "parent done");
    let replies: Vec<String> =
        serde_json::from_str(&result.tool_calls()[0].result.content).unwrap();
    assert_eq!(replies, vec!["child gave up"]);
}

#[tokio::test]
async fn forked_process_is_independent() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .fd(FdConfig::default())
        .compile()
        .unwrap();
    let client = MockClient::new(vec![text_response("first"), text_response("second")]);
    let mut parent = start(program, client.clone()).await;
    parent.run("one").await;

    let child = parent.fork_process();
    assert!(!child.fork_enabled());
    assert_eq!(child.state().len(), 2);

    // Mutating the parent after the fork is invisible to the child.
    parent.run("two").await;
    assert_eq!(parent.state().len(), 4);
    assert_eq!(child.state().len(), 2);
    assert_eq!(child.state()[0], Message::user("one"));
}

// --- Scenario: spawn ---

#[tokio::test]
async fn spawn_resolves_linked_program() {
    let helper = Program::builder()
        .model("claude-haiku-4-5", "anthropic")
        .system_prompt("You summarize.")
        .compile()
        .unwrap();
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["spawn"])
        .link("summarizer", helper, "Summarizes documents")
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![(
            "tu_1",
            "spawn",
            json!({"program_name": "summarizer", "query": "summarize the report"}),
        )]),
        text_response("summary: all good"),
        text_response("The helper says: all good"),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("delegate").await;

    assert_eq!(result.tool_calls()[0].result.content, "summary: all good");
    assert_eq!(result.last_message(), "The helper says: all good");
}

#[tokio::test]
async fn spawn_unknown_program_lists_catalog() {
    let helper = Program::builder()
        .model("claude-haiku-4-5", "anthropic")
        .compile()
        .unwrap();
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["spawn"])
        .link("summarizer", helper, "Summarizes documents")
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![(
            "tu_1",
            "spawn",
            json!({"program_name": "translator", "query": "hola"}),
        )]),
        text_response("recovered"),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("delegate").await;

    let error = &result.tool_calls()[0].result;
    assert!(error.is_error);
    assert!(error.content.contains("\"translator\" not found"));
    assert!(error.content.contains("summarizer: Summarizes documents"));
    assert_eq!(result.stop_condition(), StopCondition::Completed);
}

// --- Scenario: unknown-tool recovery ---

#[tokio::test]
async fn unknown_tool_name_recovers_with_suggestions() {
    let thinking = FunctionTool::new(
        "sequential-thinking__sequentialthinking",
        "Step-by-step thinking",
        json!({"type": "object", "properties": {}}),
        |_input, _ctx| async move { Ok(ToolResult::ok("thought")) },
    );
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .function_tool(Arc::new(thinking))
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![("tu_1", "sequential-thinking", json!({"thought": "hmm"}))]),
        text_response("self-corrected"),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("think").await;

    let error = &result.tool_calls()[0].result;
    assert!(error.is_error);
    assert!(error.content.contains("\"sequential-thinking\" not found"));
    assert!(error
        .content
        .contains("sequential-thinking__sequentialthinking"));
    assert_eq!(result.last_message(), "self-corrected");
    assert_tool_pairing(process.state());
}

// --- Aliases ---

#[tokio::test]
async fn aliased_tool_dispatches_to_canonical() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["calculator"])
        .alias("calc", "calculator")
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![("tu_1", "calc", json!({"expression": "6*7"}))]),
        text_response("42"),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("multiply").await;

    assert_eq!(result.tool_calls()[0].result.content, "42");
    // The published schema uses the alias.
    let request = client.requests().remove(0);
    assert_eq!(request.tools[0]["name"], "calc");
}

// --- goto ---

#[tokio::test]
async fn goto_rewinds_state_with_time_travel_tag() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["goto", "calculator"])
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![(
            "tu_1",
            "goto",
            json!({"position": "msg_0", "message": "start over with a better plan"}),
        )]),
        text_response("fresh start"),
    ]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("first attempt").await;

    assert_eq!(result.last_message(), "fresh start");
    let state = process.state();
    // Rewound: time-travel user message, then the fresh assistant reply.
    assert_eq!(state.len(), 2);
    assert_eq!(state[0].role, Role::User);
    assert!(state[0].text().contains("<time_travel>"));
    assert!(state[0].text().contains("start over with a better plan"));
    assert_tool_pairing(state);
}

// --- Limits and cancellation ---

#[tokio::test]
async fn iteration_budget_terminates_tool_loops() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["calculator"])
        .max_iterations(3)
        .compile()
        .unwrap();
    let responses: Vec<ApiResponse> = (0..5)
        .map(|_| tool_use_response(vec![("tu_1", "calculator", json!({"expression": "1+1"}))]))
        .collect();
    let client = MockClient::new(responses);
    let mut process = start(program, client.clone()).await;

    let result = process.run("loop forever").await;

    assert_eq!(result.stop_condition(), StopCondition::IterationLimit);
    assert_eq!(result.api_calls().len(), 3);
    // Every tool use is still answered.
    assert_tool_pairing(process.state());
}

#[tokio::test]
async fn cost_limit_stops_the_run() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["calculator"])
        .params(RuntimeParams {
            cost_limit: Some(Decimal::new(1, 3)), // $0.001
            ..RuntimeParams::default()
        })
        .compile()
        .unwrap();
    let mut expensive = tool_use_response(vec![("tu_1", "calculator", json!({"expression": "1"}))]);
    expensive.usage.input_tokens = 1_000_000;
    let client = MockClient::new(vec![expensive, text_response("never reached")]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("spend").await;

    assert_eq!(result.stop_condition(), StopCondition::CostLimit);
    assert_eq!(result.api_calls().len(), 1);
    assert!(result.usd_cost() > Decimal::ZERO);
    assert_tool_pairing(process.state());
}

#[tokio::test]
async fn cancelled_run_synthesizes_results_for_pending_tool_uses() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["calculator"])
        .compile()
        .unwrap();
    let client = MockClient::new(vec![tool_use_response(vec![
        ("tu_a", "calculator", json!({"expression": "1+1"})),
        ("tu_b", "calculator", json!({"expression": "2+2"})),
    ])]);
    let mut process = start(program, client.clone()).await;
    // Cancel between the API response and tool execution.
    client.cancel_after_create(process.cancellation_token().clone());

    let result = process.run("compute").await;

    assert_eq!(result.stop_condition(), StopCondition::Cancelled);
    let state = process.state();
    assert_tool_pairing(state);
    // Both pending tool uses got synthetic error results.
    let last = state.last().unwrap();
    assert!(last.content.iter().all(|block| matches!(
        block,
        ContentBlock::ToolResult { is_error: true, .. }
    )));
}

#[tokio::test]
async fn provider_error_aborts_with_consistent_state() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .compile()
        .unwrap();
    let client = MockClient::new(vec![]); // script exhausted immediately
    let mut process = start(program, client.clone()).await;

    let result = process.run("hello?").await;

    assert!(result.is_error());
    assert_eq!(result.stop_condition(), StopCondition::ProviderError);
    assert_tool_pairing(process.state());
    assert_eq!(process.state().len(), 1); // just the user turn
}

// --- Prompt caching and headers ---

#[tokio::test]
async fn cache_markers_annotate_payload_not_state() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .system_prompt("cached system")
        .builtin_tools(["calculator"])
        .compile()
        .unwrap();
    let client = MockClient::new(vec![text_response("ok")]);
    let mut process = start(program, client.clone()).await;

    process.run("hello").await;

    let request = client.requests().remove(0);
    assert_eq!(request.system[0]["cache_control"]["type"], "ephemeral");
    let last_tool = request.tools.last().unwrap();
    assert_eq!(last_tool["cache_control"]["type"], "ephemeral");
    let last_message = request.messages.last().unwrap();
    assert_eq!(
        last_message["content"][0]["cache_control"]["type"],
        "ephemeral"
    );
    // Persistent state carries no cache metadata (it is not even JSON).
    assert_eq!(process.state()[0], Message::user("hello"));
}

#[tokio::test]
async fn caching_can_be_disabled() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .params(RuntimeParams {
            disable_automatic_caching: true,
            ..RuntimeParams::default()
        })
        .compile()
        .unwrap();
    let client = MockClient::new(vec![text_response("ok")]);
    let mut process = start(program, client.clone()).await;

    process.run("hello").await;

    let request = client.requests().remove(0);
    assert!(request.system[0].get("cache_control").is_none());
    assert!(
        request.messages.last().unwrap()["content"][0]
            .get("cache_control")
            .is_none()
    );
}

#[tokio::test]
async fn token_efficient_header_only_for_direct_claude_3_7() {
    let program = Program::builder()
        .model("claude-3-7-sonnet-20250219", "anthropic")
        .compile()
        .unwrap();
    let client = MockClient::new(vec![text_response("ok")]);
    let mut process = start(program, client.clone()).await;
    process.run("hello").await;
    let request = client.requests().remove(0);
    assert!(request.extra_headers.iter().any(|(name, value)| {
        name == "anthropic-beta" && value == "token-efficient-tools-2025-02-19"
    }));

    let vertex_program = Program::builder()
        .model("claude-3-7-sonnet-20250219", "vertex")
        .compile()
        .unwrap();
    let vertex_client = MockClient::new(vec![text_response("ok")]);
    let mut vertex_process = start(vertex_program, vertex_client.clone()).await;
    vertex_process.run("hello").await;
    let request = vertex_client.requests().remove(0);
    assert!(request.extra_headers.is_empty());
}

#[tokio::test]
async fn thinking_budget_is_translated() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .params(RuntimeParams {
            max_tokens: 8192,
            thinking_budget: Some(2048),
            ..RuntimeParams::default()
        })
        .compile()
        .unwrap();
    let client = MockClient::new(vec![text_response("ok")]);
    let mut process = start(program, client.clone()).await;

    process.run("think hard").await;

    let request = client.requests().remove(0);
    assert_eq!(request.params["thinking"]["type"], "enabled");
    assert_eq!(request.params["thinking"]["budget_tokens"], 2048);
}

// --- Token counting ---

#[tokio::test]
async fn count_tokens_works_on_empty_state() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .compile()
        .unwrap();
    let client = MockClient::new(vec![]);
    let process = start(program, client.clone()).await;

    let count = process.count_tokens().await.unwrap();

    assert_eq!(count.input_tokens, 42);
    assert_eq!(count.context_window, 200_000);
    assert_eq!(count.remaining_tokens, 200_000 - 42);
    assert!(count.percentage > 0.0);

    // The probe turn kept the payload non-empty, without cache markers.
    let request = client.requests().remove(0);
    assert_eq!(request.messages.len(), 1);
    assert!(
        request.messages[0]["content"][0]
            .get("cache_control")
            .is_none()
    );
    // Counting never touches process state.
    assert!(process.state().is_empty());
}

// --- References ---

#[tokio::test]
async fn references_are_extracted_from_final_text() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .fd(FdConfig::default())
        .compile()
        .unwrap();
    let client = MockClient::new(vec![text_response(
        "Here is the plan:\n<ref id=\"plan\">1. write code\n2. run tests</ref>\nDone.",
    )]);
    let mut process = start(program, client.clone()).await;

    let result = process.run("plan it").await;

    // The visible text is untouched.
    assert!(result.last_message().contains("<ref id=\"plan\">"));
    // The reference is stored and readable.
    let fd = process.fd_manager().get("ref:plan").unwrap();
    assert_eq!(fd.content, "1. write code\n2. run tests");
}

// --- Enrichment and hooks ---

#[tokio::test]
async fn enriched_prompt_carries_preload_and_env() {
    let dir = tempfile::tempdir().unwrap();
    let note = dir.path().join("note.txt");
    std::fs::write(&note, "remember the context").unwrap();

    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .system_prompt("base prompt")
        .preload_files([note.clone()])
        .env_info("region", "us-east-1")
        .compile()
        .unwrap();
    let client = MockClient::new(vec![text_response("ok")]);
    let mut process = start(program, client.clone()).await;

    assert!(process.enriched_system().starts_with("base prompt"));
    assert!(process.enriched_system().contains("remember the context"));
    assert!(process.enriched_system().contains("region: us-east-1"));

    process.run("hi").await;
    let request = client.requests().remove(0);
    let system_text = request.system[0]["text"].as_str().unwrap();
    assert!(system_text.contains("remember the context"));
}

#[tokio::test]
async fn missing_preload_file_fails_start() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .preload_files(["/nonexistent/preload.txt"])
        .compile()
        .unwrap();
    let client = MockClient::new(vec![]);
    let err = program.start(client).await.unwrap_err();
    assert!(err.to_string().contains("preload"));
}

#[tokio::test]
async fn hooks_observe_responses_and_tools() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Spy {
        responses: AtomicUsize,
        tools: AtomicUsize,
    }
    impl llmproc::RunHook for Spy {
        fn on_api_response(&self, _response: &ApiResponse) {
            self.responses.fetch_add(1, Ordering::SeqCst);
        }
        fn on_tool_end(&self, _name: &str, _result: &ToolResult) {
            self.tools.fetch_add(1, Ordering::SeqCst);
        }
    }

    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .builtin_tools(["calculator"])
        .compile()
        .unwrap();
    let client = MockClient::new(vec![
        tool_use_response(vec![("tu_1", "calculator", json!({"expression": "1+2"}))]),
        text_response("3"),
    ]);
    let mut process = start(program, client.clone()).await;
    let spy = Arc::new(Spy::default());
    process.add_hook(spy.clone());

    process.run("compute").await;

    assert_eq!(spy.responses.load(Ordering::SeqCst), 2);
    assert_eq!(spy.tools.load(Ordering::SeqCst), 1);
}

// --- Cost accounting ---

#[tokio::test]
async fn run_cost_accumulates_into_process_totals() {
    let program = Program::builder()
        .model("claude-sonnet-4-20250514", "anthropic")
        .compile()
        .unwrap();
    let mut response = text_response("ok");
    response.usage.input_tokens = 1_000_000;
    response.usage.output_tokens = 1_000_000;
    let client = MockClient::new(vec![response]);
    let mut process = start(program, client.clone()).await;
    process.set_cost_model(CostModel::default());

    let result: RunResult = process.run("hi").await;

    assert_eq!(result.usd_cost(), Decimal::new(18, 0));
    assert_eq!(process.total_cost(), Decimal::new(18, 0));
    assert_eq!(process.total_usage().input_tokens, 1_000_000);
}
