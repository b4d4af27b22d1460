//! OpenAI payload assembly.

use llmproc_provider_openai::mapping;
use llmproc_types::ApiRequest;

use crate::process::Process;

use super::{EMPTY_STATE_PROBE, ProcessExecutor};

/// Shapes requests for the OpenAI Chat Completions API.
///
/// Prompt-cache markers are never emitted here; OpenAI caches prefixes
/// server-side without annotations.
pub struct OpenAiExecutor;

impl ProcessExecutor for OpenAiExecutor {
    fn assemble(&self, process: &Process, _with_cache: bool) -> ApiRequest {
        let program = process.program();

        let mut messages = mapping::map_messages(process.state());
        if messages.is_empty() {
            messages.push(serde_json::json!({
                "role": "user",
                "content": EMPTY_STATE_PROBE,
            }));
        }
        let definitions = process.tools().definitions(program);
        let tools = mapping::map_tools(&definitions);

        let mut params = serde_json::Map::new();
        params.insert(
            "max_completion_tokens".into(),
            program.params.max_tokens.into(),
        );
        if let Some(temperature) = program.params.temperature {
            params.insert("temperature".into(), serde_json::Value::from(temperature));
        }
        if let Some(top_p) = program.params.top_p {
            params.insert("top_p".into(), serde_json::Value::from(top_p));
        }
        if let Some(effort) = &program.params.reasoning_effort
            && mapping::is_o_family(&program.model)
        {
            params.insert(
                "reasoning_effort".into(),
                serde_json::Value::String(effort.clone()),
            );
        }

        ApiRequest {
            model: program.model.clone(),
            system: mapping::map_system(process.enriched_system()),
            messages,
            tools,
            params,
            extra_headers: Vec::new(),
        }
    }
}
