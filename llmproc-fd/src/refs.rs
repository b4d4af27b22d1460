//! Extraction of `<ref id="…">` blocks from assistant output.

use std::sync::LazyLock;

use regex::Regex;

// (?s) so the body may span lines; non-greedy so adjacent refs don't merge.
static REF_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<ref\s+id="([^"]+)">(.*?)</ref>"#).unwrap());

/// Extract all labeled reference blocks from `text`.
///
/// Returns `(label, body)` pairs in order of appearance. The text itself is
/// left untouched by callers; the model's prose around the refs stays
/// visible to the user.
#[must_use]
pub fn extract_references(text: &str) -> Vec<(String, String)> {
    REF_BLOCK
        .captures_iter(text)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}
