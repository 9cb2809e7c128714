// Small text helpers for diagnostics: bounded snippets and lossy byte decoding.
use bstr::ByteSlice;

const ELLIPSIS: &str = "...";

/// Shortens `input` to at most `max` characters, marking the cut with `...`.
pub fn abbreviate(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    if max <= ELLIPSIS.len() {
        return ELLIPSIS[..max].to_string();
    }
    let take = max - ELLIPSIS.len();
    let mut snippet: String = input.chars().take(take).collect();
    snippet.push_str(ELLIPSIS);
    snippet
}

/// Decodes bytes for display only; invalid sequences become U+FFFD.
pub fn lossy_snippet(input: &[u8], max: usize) -> String {
    abbreviate(&input.to_str_lossy(), max)
}
