//! Shared utility functions for the Aurora crate.

/// Slice from the first `{` to the last `}` in `text`, inclusive.
///
/// This is deliberately lenient: nothing checks that the braces balance or
/// that the span is valid JSON. Callers decode the span and fall back on
/// failure.
pub fn braced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
