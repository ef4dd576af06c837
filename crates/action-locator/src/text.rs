//! Text normalization and fuzzy matching.

/// Lowercase, trimmed, whitespace-collapsed.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Exact match, or containment in either direction, after normalization. Empty strings
/// never match.
pub fn text_matches(candidate: &str, needle: &str) -> bool {
    let candidate = normalize_text(candidate);
    let needle = normalize_text(needle);
    if candidate.is_empty() || needle.is_empty() {
        return false;
    }
    candidate == needle || candidate.contains(&needle) || needle.contains(&candidate)
}
