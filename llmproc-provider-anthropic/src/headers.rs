//! Beta-header policy for Anthropic requests.

/// Header name for Anthropic beta feature flags.
pub const ANTHROPIC_BETA: &str = "anthropic-beta";

/// Beta flag enabling token-efficient tool use.
pub const TOKEN_EFFICIENT_TOOLS: &str = "token-efficient-tools-2025-02-19";

/// Whether a model id is eligible for token-efficient tool use.
#[must_use]
pub fn supports_token_efficient_tools(model: &str) -> bool {
    model.starts_with("claude-3-7")
}

/// Enforce the token-efficient-tools header policy.
///
/// Direct-Anthropic `claude-3-7*` requests get the beta flag added. Under
/// any other configuration a pre-existing flag is stripped with a warning,
/// since the API would reject or ignore it.
#[must_use]
pub fn apply_token_efficient_policy(
    mut headers: Vec<(String, String)>,
    model: &str,
    is_vertex: bool,
) -> Vec<(String, String)> {
    let eligible = !is_vertex && supports_token_efficient_tools(model);
    if eligible {
        let already_present = headers
            .iter()
            .any(|(name, value)| name == ANTHROPIC_BETA && value.contains(TOKEN_EFFICIENT_TOOLS));
        if !already_present {
            headers.push((ANTHROPIC_BETA.into(), TOKEN_EFFICIENT_TOOLS.into()));
        }
        return headers;
    }

    let before = headers.len();
    headers.retain(|(name, value)| {
        !(name == ANTHROPIC_BETA && value.contains(TOKEN_EFFICIENT_TOOLS))
    });
    if headers.len() != before {
        tracing::warn!(
            model = %model,
            vertex = is_vertex,
            "stripping token-efficient-tools beta header, unsupported configuration"
        );
    }
    headers
}
