//! OpenAI API client struct and transport.

use llmproc_types::{ApiRequest, ApiResponse, BoxFuture, ProviderClient, ProviderError};

use crate::mapping::parse_response;

/// Default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Client for the OpenAI Chat Completions API.
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the API base URL (testing, proxies, compatible servers).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn body(request: &ApiRequest) -> serde_json::Value {
        // The system prompt is already a leading developer message; splice
        // it in front of the conversation.
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_null() {
            messages.push(request.system.clone());
        }
        messages.extend(request.messages.iter().cloned());

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::Value::Array(request.tools.clone());
        }
        if let Some(obj) = body.as_object_mut() {
            for (key, value) in &request.params {
                obj.insert(key.clone(), value.clone());
            }
        }
        body
    }
}

impl ProviderClient for OpenAiClient {
    fn create(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ProviderError>> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = Self::body(&request);
        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json");
        for (name, value) in &request.extra_headers {
            builder = builder.header(name, value);
        }

        Box::pin(async move {
            tracing::debug!(url = %url, model = %body["model"], "sending chat completion request");
            let response = builder
                .json(&body)
                .send()
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(match status.as_u16() {
                    401 | 403 => ProviderError::Authentication(text),
                    429 => ProviderError::RateLimit { retry_after: None },
                    400 | 422 => ProviderError::InvalidRequest(text),
                    code => ProviderError::Http {
                        status: code,
                        body: text,
                    },
                });
            }

            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            parse_response(&body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_splices_system_before_messages() {
        let mut params = serde_json::Map::new();
        params.insert("max_completion_tokens".into(), json!(512));
        let request = ApiRequest {
            model: "gpt-4o".into(),
            system: json!({"role": "developer", "content": "Be terse."}),
            messages: vec![json!({"role": "user", "content": "hi"})],
            tools: vec![],
            params,
            extra_headers: vec![],
        };
        let body = OpenAiClient::body(&request);
        assert_eq!(body["messages"][0]["role"], "developer");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_completion_tokens"], 512);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn body_without_system_keeps_messages_only() {
        let request = ApiRequest {
            model: "gpt-4o".into(),
            messages: vec![json!({"role": "user", "content": "hi"})],
            ..ApiRequest::default()
        };
        let body = OpenAiClient::body(&request);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }
}
