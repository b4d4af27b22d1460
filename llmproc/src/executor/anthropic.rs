//! Anthropic payload assembly.

use llmproc_provider_anthropic::{cache, headers, mapping};
use llmproc_types::ApiRequest;

use crate::process::Process;

use super::{EMPTY_STATE_PROBE, ProcessExecutor};

/// Shapes requests for the Anthropic Messages API, direct or Vertex.
pub struct AnthropicExecutor {
    /// Vertex-served models reject the token-efficient beta header.
    pub(crate) vertex: bool,
}

impl ProcessExecutor for AnthropicExecutor {
    fn assemble(&self, process: &Process, with_cache: bool) -> ApiRequest {
        let program = process.program();

        let mut messages = mapping::map_messages(process.state());
        if messages.is_empty() {
            messages.push(serde_json::json!({
                "role": "user",
                "content": [{"type": "text", "text": EMPTY_STATE_PROBE}],
            }));
        }
        let mut system = mapping::map_system(process.enriched_system());
        let definitions = process.tools().definitions(program);
        let mut tools = mapping::map_tools(&definitions);

        if with_cache {
            cache::apply_cache_markers(&mut system, &mut messages, &mut tools);
        }

        let mut params = serde_json::Map::new();
        params.insert("max_tokens".into(), program.params.max_tokens.into());
        if let Some(temperature) = program.params.temperature {
            params.insert("temperature".into(), serde_json::Value::from(temperature));
        }
        if let Some(top_p) = program.params.top_p {
            params.insert("top_p".into(), serde_json::Value::from(top_p));
        }
        if let Some(budget) = program.params.thinking_budget {
            params.insert("thinking".into(), mapping::thinking_param(budget));
        }

        let extra_headers =
            headers::apply_token_efficient_policy(Vec::new(), &program.model, self.vertex);

        ApiRequest {
            model: program.model.clone(),
            system,
            messages,
            tools,
            params,
            extra_headers,
        }
    }
}
