//! Token counting against the context window.

use llmproc_types::ProviderError;

use crate::process::Process;

use super::executor_for;

/// Context window sizes by model-id prefix, first match wins.
const CONTEXT_WINDOWS: &[(&str, u64)] = &[
    ("claude-opus-4", 200_000),
    ("claude-sonnet-4", 200_000),
    ("claude-haiku", 200_000),
    ("claude-3", 200_000),
    ("gpt-4o", 128_000),
    ("o1", 200_000),
    ("o3", 200_000),
];

/// Conservative window for models not in the table.
const DEFAULT_CONTEXT_WINDOW: u64 = 100_000;

/// The context window for a model id.
#[must_use]
pub fn context_window_for(model: &str) -> u64 {
    CONTEXT_WINDOWS
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map_or(DEFAULT_CONTEXT_WINDOW, |(_, window)| *window)
}

/// Result of a token count.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenCount {
    /// Input tokens the next call would send.
    pub input_tokens: u64,
    /// The model's context window.
    pub context_window: u64,
    /// Percentage of the window in use.
    pub percentage: f64,
    /// Tokens left before the window fills.
    pub remaining_tokens: u64,
}

/// Count the input tokens for the process's next call.
///
/// Assembles the same payload as a run, minus cache markers, and asks the
/// provider's counting endpoint. An empty state is padded with the benign
/// probe turn inside `assemble`.
pub(crate) async fn count_tokens(process: &Process) -> Result<TokenCount, ProviderError> {
    let executor = executor_for(process.program.provider);
    let request = executor.assemble(process, false);
    let input_tokens = process.client.count_tokens(request).await?;

    let context_window = context_window_for(&process.program.model);
    Ok(TokenCount {
        input_tokens,
        context_window,
        percentage: input_tokens as f64 * 100.0 / context_window as f64,
        remaining_tokens: context_window.saturating_sub(input_tokens),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_prefixes_resolve() {
        assert_eq!(context_window_for("claude-sonnet-4-20250514"), 200_000);
        assert_eq!(context_window_for("claude-3-7-sonnet-20250219"), 200_000);
        assert_eq!(context_window_for("gpt-4o-mini"), 128_000);
    }

    #[test]
    fn unknown_models_get_conservative_default() {
        assert_eq!(context_window_for("mystery-model"), 100_000);
    }
}
