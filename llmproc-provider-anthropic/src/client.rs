//! Anthropic API client struct and transport.

use llmproc_types::{ApiRequest, ApiResponse, BoxFuture, ProviderClient, ProviderError};

use crate::error::{map_reqwest_error, map_status};
use crate::mapping::parse_response;

/// Default Anthropic API base URL.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// How the client authenticates.
#[derive(Debug, Clone)]
pub enum AnthropicAuth {
    /// Direct API access with an `x-api-key` header.
    ApiKey(String),
    /// Vertex-style access with a bearer token.
    Bearer(String),
}

/// Client for the Anthropic Messages API.
///
/// Covers direct Anthropic and Anthropic-on-Vertex; the two differ only in
/// base URL and auth header. Payloads arrive fully shaped; this type owns
/// transport, auth, and response parsing.
pub struct AnthropicClient {
    auth: AnthropicAuth,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a direct-API client with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            auth: AnthropicAuth::ApiKey(api_key.into()),
            base_url: DEFAULT_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a Vertex client with a bearer token and an explicit base URL
    /// (region/project specific).
    #[must_use]
    pub fn vertex(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            auth: AnthropicAuth::Bearer(token.into()),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the API base URL (testing, proxies).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Assemble the JSON body from a shaped request.
    fn body(request: &ApiRequest, include_params: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
        });
        if !request.system.is_null() {
            body["system"] = request.system.clone();
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::Value::Array(request.tools.clone());
        }
        if include_params
            && let Some(obj) = body.as_object_mut()
        {
            for (key, value) in &request.params {
                obj.insert(key.clone(), value.clone());
            }
        }
        body
    }

    fn request_builder(&self, url: &str, request: &ApiRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json");
        builder = match &self.auth {
            AnthropicAuth::ApiKey(key) => builder.header("x-api-key", key),
            AnthropicAuth::Bearer(token) => builder.bearer_auth(token),
        };
        for (name, value) in &request.extra_headers {
            builder = builder.header(name, value);
        }
        builder
    }

    async fn post_json(
        builder: reqwest::RequestBuilder,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = builder.json(&body).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .map(std::time::Duration::from_secs);
            let text = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), text, retry_after));
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

impl ProviderClient for AnthropicClient {
    fn create(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ProviderError>> {
        let url = self.endpoint("/v1/messages");
        let body = Self::body(&request, true);
        let builder = self.request_builder(&url, &request);
        Box::pin(async move {
            tracing::debug!(url = %url, model = %body["model"], "sending messages request");
            let response = Self::post_json(builder, body).await?;
            parse_response(&response)
        })
    }

    fn count_tokens(&self, request: ApiRequest) -> BoxFuture<'_, Result<u64, ProviderError>> {
        let url = self.endpoint("/v1/messages/count_tokens");
        // The counting endpoint rejects generation parameters.
        let body = Self::body(&request, false);
        let builder = self.request_builder(&url, &request);
        Box::pin(async move {
            let response = Self::post_json(builder, body).await?;
            response["input_tokens"].as_u64().ok_or_else(|| {
                ProviderError::InvalidResponse("count_tokens response without input_tokens".into())
            })
        })
    }
}
