//! Inbound text cleanup and outbound reply chunking.

use std::sync::LazyLock;

use regex::Regex;

/// Matches Discord markup tokens such as `<@123>`, `<#456>` or `<:emoji:789>`.
static MARKUP_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"<[^>]+>").unwrap()
});

/// Remove every `<…>` markup token and the whitespace left at the start.
///
/// `"<@123> hello <#456>"` becomes `"hello "`.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    MARKUP_TOKEN
        .replace_all(text, "")
        .trim_start()
        .to_string()
}

/// Split `text` into consecutive chunks of at most `max_chars` characters.
///
/// Chunks are cut at character boundaries only, so concatenating them gives
/// back `text` exactly. An empty input yields no chunks.
#[must_use]
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(text.chars().count().div_ceil(max_chars));
    let mut remaining = text;
    while !remaining.is_empty() {
        let split_at = remaining
            .char_indices()
            .nth(max_chars)
            .map_or(remaining.len(), |(idx, _)| idx);
        let (head, tail) = remaining.split_at(split_at);
        chunks.push(head.to_string());
        remaining = tail;
    }

    chunks
}
