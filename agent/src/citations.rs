//! Helpers for citation previews and reference markers in answer text.

use crate::models::ClientCitation;
use regex::Regex;
use std::sync::LazyLock;

/// Longest preview attached to a citation. Teams rejects abstracts over 480
/// characters; the remainder is headroom for the truncation marker.
pub const MAX_PREVIEW_CHARS: usize = 400;

static DOC_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[doc(\d+)\]").expect("doc marker pattern is valid"));

/// Shortens `text` to a body of at most `max_length` characters, cutting back
/// to the last whitespace in the window, then appends `...`. The marker is not
/// counted against `max_length`, so a shortened preview is up to
/// `max_length + 3` characters. A window whose only whitespace is its first
/// character is kept whole. Text that already fits is returned unchanged.
pub fn snippet(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let window: String = text.chars().take(max_length).collect();
    let cut = match window.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => window[..idx].trim_end(),
        _ => window.as_str(),
    };
    format!("{cut}...")
}

/// Rewrites `[docN]` markers produced by the search data source into `[N]`.
pub fn format_citations_response(text: &str) -> String {
    DOC_MARKER.replace_all(text, "[$1]").into_owned()
}

/// Citations whose `[n]` marker appears literally in `text`, in position order.
pub fn get_used_citations(text: &str, citations: &[ClientCitation]) -> Vec<ClientCitation> {
    citations
        .iter()
        .filter(|citation| text.contains(&citation.marker()))
        .cloned()
        .collect()
}
