//! HTTP error mapping for the Anthropic client.

use std::time::Duration;

use llmproc_types::ProviderError;

/// Map a non-success HTTP status into a [`ProviderError`].
pub(crate) fn map_status(status: u16, body: String, retry_after: Option<Duration>) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Authentication(body),
        429 => ProviderError::RateLimit { retry_after },
        400 | 422 => ProviderError::InvalidRequest(body),
        _ => ProviderError::Http { status, body },
    }
}

/// Map a reqwest transport error into a [`ProviderError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    ProviderError::Network(err.to_string())
}
